pub mod browser_manager;
pub mod cdp_page;
pub mod inspector;
pub mod layout;
