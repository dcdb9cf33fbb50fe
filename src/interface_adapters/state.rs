use crate::use_cases::UserService;

// Shared application state for the HTTP handlers.
#[derive(Debug, Default)]
pub struct AppState {
    pub users: UserService,
}

impl AppState {
    pub fn new(users: UserService) -> Self {
        Self { users }
    }
}
