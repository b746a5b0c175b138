//! Products (inventory) page object

use tracing::debug;

use super::base::PageDriver;
use crate::Error;

const PAGE_TITLE: &str = ".title";
const INVENTORY_CONTAINER: &str = ".inventory_container";
const INVENTORY_ITEM: &str = ".inventory_item";
const CART_LINK: &str = ".shopping_cart_link";
const MENU_BUTTON: &str = "#react-burger-menu-btn";
const APP_LOGO: &str = ".app_logo";

/// The inventory screen shown after a successful login
#[derive(Debug, Clone)]
pub struct ProductsPage {
    driver: PageDriver,
}

impl ProductsPage {
    pub fn new(driver: PageDriver) -> Self {
        Self { driver }
    }

    pub fn driver(&self) -> &PageDriver {
        &self.driver
    }

    /// Wait for the inventory to render after login
    pub async fn wait_until_loaded(&self) -> Result<(), Error> {
        self.driver
            .wait_for_visible(INVENTORY_CONTAINER, self.driver.default_timeout())
            .await
    }

    /// Whether the header, inventory, cart, and menu are all visible
    ///
    /// All checks run even after one fails, so the log names every missing
    /// element rather than just the first.
    pub async fn is_loaded(&self) -> bool {
        let mut loaded = true;
        for selector in [PAGE_TITLE, INVENTORY_CONTAINER, CART_LINK, MENU_BUTTON] {
            if !self.driver.is_visible_now(selector).await {
                debug!("Products page element not visible: {}", selector);
                loaded = false;
            }
        }
        loaded
    }

    /// Header text, normally "Products"
    pub async fn header_title(&self) -> Result<String, Error> {
        self.driver.read_text(PAGE_TITLE).await
    }

    /// Application logo text
    pub async fn logo_text(&self) -> Result<String, Error> {
        self.driver.read_text(APP_LOGO).await
    }

    /// Number of inventory cards on the page
    pub async fn item_count(&self) -> Result<usize, Error> {
        self.driver.query_count(INVENTORY_ITEM).await
    }

    /// Open the hamburger menu
    pub async fn open_menu(&self) -> Result<(), Error> {
        self.driver.click(MENU_BUTTON).await
    }

    /// Whether the shopping cart link is visible
    pub async fn is_cart_visible(&self) -> bool {
        self.driver.is_visible_now(CART_LINK).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mock::MockLauncher;
    use crate::engine::traits::{EngineLauncher, LaunchOptions, Viewport};
    use crate::page::login::LoginPage;
    use std::time::Duration;

    async fn logged_in_products() -> ProductsPage {
        let launcher = MockLauncher::new();
        let engine = launcher.launch(&LaunchOptions::default()).await.unwrap();
        let context = engine.new_context(Viewport::default()).await.unwrap();
        let page = context.new_page().await.unwrap();
        let driver = PageDriver::new(page, Duration::from_millis(300));

        let login = LoginPage::new(driver.clone());
        login.open("https://www.saucedemo.com/").await.unwrap();
        login.login("standard_user", "secret_sauce").await.unwrap();

        ProductsPage::new(driver)
    }

    #[tokio::test]
    async fn test_inventory_loads_after_login() {
        let products = logged_in_products().await;
        products.wait_until_loaded().await.unwrap();
        assert!(products.is_loaded().await);
        assert_eq!(products.header_title().await.unwrap(), "Products");
        assert_eq!(products.logo_text().await.unwrap(), "Swag Labs");
    }

    #[tokio::test]
    async fn test_item_count_matches_catalog() {
        let products = logged_in_products().await;
        products.wait_until_loaded().await.unwrap();
        assert_eq!(products.item_count().await.unwrap(), 6);
        assert!(products.is_cart_visible().await);
    }
}
