use crate::auth::token::TokenService;
use crate::notify::Dispatcher;
use crate::tickets::TicketDesk;
use crate::users::Directory;

pub struct AppState {
    pub directory: Directory,
    pub desk: TicketDesk,
    pub tokens: TokenService,
    pub notifier: Dispatcher,
}
