pub mod driver;
pub mod locator;
pub mod resolver;
pub mod wait;
pub mod webdriver;
