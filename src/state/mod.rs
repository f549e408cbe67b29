pub mod order_book;
pub mod session;

pub use order_book::{OrderBook, OrderLine};
pub use session::{generate_session_id, ChatSession};
