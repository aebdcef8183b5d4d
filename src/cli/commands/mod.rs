pub mod activity;
pub mod book;
pub mod dashboard;
pub mod library;

/// Pagination parameters for list commands
#[derive(Debug, Default)]
pub struct PageParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[cfg(test)]
#[path = "test_server.rs"]
mod test_server;
