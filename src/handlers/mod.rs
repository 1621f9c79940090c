mod short_link;

pub use short_link::{
    create_handler, info_handler, list_handler, redirect_handler, unlock_handler,
    verify_password_handler,
};
