pub mod login_tab;
pub mod settings_tab;
