//! Simulated storefront driver
//!
//! An in-memory model of the Swag Labs demo store. It resolves the same
//! selectors the recorded scenarios use, applies the same one-match and
//! interactability rules as the Chrome driver, and captures the page as a
//! JSON snapshot. Every session starts from a clean store.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::{Driver, Selection, Session};
use crate::common::{Error, Result, StepError, StepResult};

const ACCEPTED_USERS: &[&str] = &[
    "standard_user",
    "problem_user",
    "performance_glitch_user",
    "visual_user",
    "error_user",
];
const LOCKED_USER: &str = "locked_out_user";
const PASSWORD: &str = "secret_sauce";

struct Product {
    slug: &'static str,
    name: &'static str,
    price_cents: u32,
}

const PRODUCTS: &[Product] = &[
    Product {
        slug: "sauce-labs-backpack",
        name: "Sauce Labs Backpack",
        price_cents: 2999,
    },
    Product {
        slug: "sauce-labs-bike-light",
        name: "Sauce Labs Bike Light",
        price_cents: 999,
    },
    Product {
        slug: "sauce-labs-bolt-t-shirt",
        name: "Sauce Labs Bolt T-Shirt",
        price_cents: 1599,
    },
    Product {
        slug: "sauce-labs-fleece-jacket",
        name: "Sauce Labs Fleece Jacket",
        price_cents: 4999,
    },
    Product {
        slug: "sauce-labs-onesie",
        name: "Sauce Labs Onesie",
        price_cents: 799,
    },
    Product {
        slug: "test.allthethings()-t-shirt-(red)",
        name: "Test.allTheThings() T-Shirt (Red)",
        price_cents: 1599,
    },
];

/// (value, label)
const SORT_OPTIONS: &[(&str, &str)] = &[
    ("az", "Name (A to Z)"),
    ("za", "Name (Z to A)"),
    ("lohi", "Price (low to high)"),
    ("hilo", "Price (high to low)"),
];

/// Shared counters for observing sessions from tests and dry runs
#[derive(Debug, Default)]
pub struct SessionProbe {
    opened: AtomicUsize,
    closed: AtomicUsize,
    actions: Mutex<Vec<String>>,
}

impl SessionProbe {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Actions attempted so far, across all sessions, in call order
    pub fn actions(&self) -> Vec<String> {
        self.actions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn record(&self, action: String) {
        self.actions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(action);
    }
}

/// Driver for the in-memory storefront
#[derive(Debug, Clone)]
pub struct SimulatedDriver {
    base_url: String,
    latency: Duration,
    probe: Arc<SessionProbe>,
}

impl SimulatedDriver {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            latency: Duration::ZERO,
            probe: Arc::new(SessionProbe::default()),
        }
    }

    /// Delay every action by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn probe(&self) -> Arc<SessionProbe> {
        Arc::clone(&self.probe)
    }
}

#[async_trait]
impl Driver for SimulatedDriver {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn open(&self) -> Result<Box<dyn Session>> {
        self.probe.opened.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("Opened simulated session for {}", self.base_url);

        Ok(Box::new(SimulatedSession {
            base_url: self.base_url.clone(),
            latency: self.latency,
            probe: Arc::clone(&self.probe),
            store: Storefront::default(),
            closed: false,
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Screen {
    #[default]
    Blank,
    Login,
    Inventory,
    Cart,
}

impl Screen {
    fn as_str(&self) -> &'static str {
        match self {
            Screen::Blank => "blank",
            Screen::Login => "login",
            Screen::Inventory => "inventory",
            Screen::Cart => "cart",
        }
    }
}

#[derive(Debug, Default)]
struct Storefront {
    url: String,
    screen: Screen,
    username: String,
    password: String,
    logged_in: bool,
    error: Option<String>,
    sort: String,
    /// Product indices in the order they were added
    cart: Vec<usize>,
}

/// Something a selector can resolve to on the current screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    UsernameInput,
    PasswordInput,
    LoginButton,
    Logo,
    ErrorBanner,
    Title,
    SortSelect,
    AddToCart(usize),
    Remove(usize),
    CartLink,
    CartBadge,
    CartItem(usize),
    ContinueShopping,
    Checkout,
}

fn entry(target: Target, selectors: &[&str]) -> (Target, Vec<String>) {
    (target, selectors.iter().map(|s| s.to_string()).collect())
}

impl Storefront {
    fn targets(&self) -> Vec<(Target, Vec<String>)> {
        let mut targets = Vec::new();

        match self.screen {
            Screen::Blank => {}
            Screen::Login => {
                targets.push(entry(Target::UsernameInput, &[r#"[data-test="username"]"#, "#user-name"]));
                targets.push(entry(Target::PasswordInput, &[r#"[data-test="password"]"#, "#password"]));
                targets.push(entry(Target::LoginButton, &[r#"[data-test="login-button"]"#, "#login-button"]));
                targets.push(entry(Target::Logo, &[".login_logo"]));
                if self.error.is_some() {
                    targets.push(entry(Target::ErrorBanner, &[r#"[data-test="error"]"#]));
                }
            }
            Screen::Inventory => {
                targets.push(entry(Target::Title, &[".title", r#"[data-test="title"]"#]));
                targets.push(entry(
                    Target::SortSelect,
                    &[
                        r#"[data-test="product-sort-container"]"#,
                        ".product_sort_container",
                    ],
                ));
                for (i, product) in PRODUCTS.iter().enumerate() {
                    let (target, prefix) = if self.cart.contains(&i) {
                        (Target::Remove(i), "remove")
                    } else {
                        (Target::AddToCart(i), "add-to-cart")
                    };
                    let by_test = format!(r#"[data-test="{}-{}"]"#, prefix, product.slug);
                    let by_id = format!("#{}-{}", prefix, product.slug);
                    targets.push(entry(target, &[by_test.as_str(), by_id.as_str(), ".btn_inventory"]));
                }
                self.add_cart_link(&mut targets);
            }
            Screen::Cart => {
                targets.push(entry(Target::Title, &[".title", r#"[data-test="title"]"#]));
                for &i in &self.cart {
                    let product = &PRODUCTS[i];
                    targets.push(entry(Target::CartItem(i), &[".cart_item"]));
                    let by_test = format!(r#"[data-test="remove-{}"]"#, product.slug);
                    let by_id = format!("#remove-{}", product.slug);
                    targets.push(entry(Target::Remove(i), &[by_test.as_str(), by_id.as_str()]));
                }
                targets.push(entry(
                    Target::ContinueShopping,
                    &[r#"[data-test="continue-shopping"]"#, "#continue-shopping"],
                ));
                targets.push(entry(Target::Checkout, &[r#"[data-test="checkout"]"#, "#checkout"]));
                self.add_cart_link(&mut targets);
            }
        }

        targets
    }

    fn add_cart_link(&self, targets: &mut Vec<(Target, Vec<String>)>) {
        targets.push(entry(
            Target::CartLink,
            &[".shopping_cart_link", r#"[data-test="shopping-cart-link"]"#],
        ));
        if !self.cart.is_empty() {
            targets.push(entry(Target::CartBadge, &[".shopping_cart_badge"]));
        }
    }

    /// Resolve a selector to exactly one target
    fn resolve(&self, selector: &str) -> StepResult<Target> {
        let matches: Vec<Target> = self
            .targets()
            .into_iter()
            .filter(|(_, selectors)| selectors.iter().any(|s| s == selector))
            .map(|(target, _)| target)
            .collect();

        match matches.as_slice() {
            [target] => Ok(*target),
            _ => Err(StepError::not_found(selector, matches.len())),
        }
    }

    fn navigate(&mut self, base_url: &str, url: &str) -> StepResult<()> {
        let path = url
            .strip_prefix(base_url)
            .filter(|rest| rest.is_empty() || rest.starts_with('/'))
            .ok_or_else(|| StepError::navigation(url, "host unreachable"))?;

        self.url = url.to_string();
        self.error = None;
        match path.trim_end_matches('/') {
            "" => {
                self.screen = Screen::Login;
                self.username.clear();
                self.password.clear();
            }
            "/inventory.html" => self.require_login("/inventory.html", Screen::Inventory),
            "/cart.html" => self.require_login("/cart.html", Screen::Cart),
            other => {
                return Err(StepError::navigation(
                    url,
                    format!("404 Not Found: {}", other),
                ))
            }
        }
        Ok(())
    }

    fn require_login(&mut self, path: &str, screen: Screen) {
        if self.logged_in {
            self.screen = screen;
        } else {
            self.screen = Screen::Login;
            self.error = Some(format!(
                "Epic sadface: You can only access '{}' when you are logged in.",
                path
            ));
        }
    }

    fn fill(&mut self, selector: &str, value: &str) -> StepResult<()> {
        match self.resolve(selector)? {
            Target::UsernameInput => self.username = value.to_string(),
            Target::PasswordInput => self.password = value.to_string(),
            _ => return Err(StepError::not_interactable(selector, "not an editable element")),
        }
        Ok(())
    }

    fn click(&mut self, base_url: &str, selector: &str) -> StepResult<()> {
        match self.resolve(selector)? {
            Target::LoginButton => self.submit_login(base_url),
            Target::AddToCart(i) => self.cart.push(i),
            Target::Remove(i) => self.cart.retain(|&c| c != i),
            Target::CartLink => {
                self.screen = Screen::Cart;
                self.url = format!("{}/cart.html", base_url);
            }
            Target::ContinueShopping => {
                self.screen = Screen::Inventory;
                self.url = format!("{}/inventory.html", base_url);
            }
            // Checkout flow and static elements: the click lands but nothing changes
            _ => {}
        }
        Ok(())
    }

    fn submit_login(&mut self, base_url: &str) {
        let error = if self.username.is_empty() {
            Some("Epic sadface: Username is required")
        } else if self.password.is_empty() {
            Some("Epic sadface: Password is required")
        } else if self.password != PASSWORD {
            Some("Epic sadface: Username and password do not match any user in this service")
        } else if self.username == LOCKED_USER {
            Some("Epic sadface: Sorry, this user has been locked out.")
        } else if !ACCEPTED_USERS.contains(&self.username.as_str()) {
            Some("Epic sadface: Username and password do not match any user in this service")
        } else {
            None
        };

        match error {
            Some(message) => self.error = Some(message.to_string()),
            None => {
                self.logged_in = true;
                self.error = None;
                self.screen = Screen::Inventory;
                self.url = format!("{}/inventory.html", base_url);
                self.sort = "az".to_string();
            }
        }
    }

    fn select_option(&mut self, selector: &str, value: &str) -> StepResult<Selection> {
        if self.resolve(selector)? != Target::SortSelect {
            return Err(StepError::not_interactable(selector, "not a select element"));
        }

        let (chosen, _) = SORT_OPTIONS
            .iter()
            .find(|(v, label)| *v == value || *label == value)
            .ok_or_else(|| StepError::InvalidOption {
                selector: selector.to_string(),
                value: value.to_string(),
                available: SORT_OPTIONS.iter().map(|(v, _)| v.to_string()).collect(),
            })?;
        self.sort = chosen.to_string();
        Ok(Selection {
            matched: chosen.to_string(),
            value: self.sort.clone(),
        })
    }

    fn sorted_products(&self) -> Vec<&'static Product> {
        let mut products: Vec<&Product> = PRODUCTS.iter().collect();
        match self.sort.as_str() {
            "za" => products.sort_by(|a, b| b.name.cmp(a.name)),
            "lohi" => products.sort_by_key(|p| p.price_cents),
            "hilo" => products.sort_by(|a, b| b.price_cents.cmp(&a.price_cents)),
            _ => products.sort_by(|a, b| a.name.cmp(b.name)),
        }
        products
    }

    fn snapshot(&self) -> PageSnapshot {
        let title = match self.screen {
            Screen::Blank => "",
            Screen::Login => "Swag Labs",
            Screen::Inventory => "Products",
            Screen::Cart => "Your Cart",
        };

        PageSnapshot {
            url: self.url.clone(),
            screen: self.screen.as_str(),
            title,
            error: self.error.clone(),
            sort: (self.screen == Screen::Inventory).then(|| self.sort.clone()),
            products: if self.screen == Screen::Inventory {
                self.sorted_products().iter().map(|p| p.name).collect()
            } else {
                Vec::new()
            },
            cart_badge: (!self.cart.is_empty() && self.screen != Screen::Login)
                .then_some(self.cart.len()),
            cart_items: if self.screen == Screen::Cart {
                self.cart.iter().map(|&i| PRODUCTS[i].name).collect()
            } else {
                Vec::new()
            },
        }
    }
}

/// What a simulated capture contains
#[derive(Debug, Serialize)]
struct PageSnapshot {
    url: String,
    screen: &'static str,
    title: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sort: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    products: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cart_badge: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    cart_items: Vec<&'static str>,
}

struct SimulatedSession {
    base_url: String,
    latency: Duration,
    probe: Arc<SessionProbe>,
    store: Storefront,
    closed: bool,
}

impl SimulatedSession {
    async fn act(&self, action: String) {
        self.probe.record(action);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl Session for SimulatedSession {
    async fn navigate(&mut self, url: &str) -> StepResult<()> {
        self.act(format!("navigate {}", url)).await;
        self.store.navigate(&self.base_url, url)
    }

    async fn fill(&mut self, selector: &str, value: &str) -> StepResult<()> {
        self.act(format!("fill {}", selector)).await;
        self.store.fill(selector, value)
    }

    async fn click(&mut self, selector: &str) -> StepResult<()> {
        self.act(format!("click {}", selector)).await;
        self.store.click(&self.base_url, selector)
    }

    async fn select_option(&mut self, selector: &str, value: &str) -> StepResult<Selection> {
        self.act(format!("select_option {}", selector)).await;
        self.store.select_option(selector, value)
    }

    async fn capture(&mut self, path: &Path) -> StepResult<Vec<u8>> {
        self.act("capture".to_string()).await;
        serde_json::to_vec_pretty(&self.store.snapshot())
            .map_err(|e| StepError::capture(&path.display().to_string(), e))
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Err(Error::Session("session already closed".to_string()));
        }
        self.closed = true;
        self.probe.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://www.saucedemo.com";

    fn logged_in() -> Storefront {
        let mut store = Storefront::default();
        store.navigate(BASE, BASE).unwrap();
        store.fill(r#"[data-test="username"]"#, "standard_user").unwrap();
        store.fill(r#"[data-test="password"]"#, "secret_sauce").unwrap();
        store.click(BASE, r#"[data-test="login-button"]"#).unwrap();
        store
    }

    #[test]
    fn test_valid_login_reaches_inventory() {
        let store = logged_in();
        assert_eq!(store.screen, Screen::Inventory);
        assert_eq!(store.url, "https://www.saucedemo.com/inventory.html");
        assert!(store.error.is_none());
    }

    #[test]
    fn test_login_errors() {
        let cases = [
            ("", "secret_sauce", "Username is required"),
            ("standard_user", "", "Password is required"),
            ("locked_out_user", "secret_sauce", "locked out"),
            ("standard_use", "secret_sauce", "do not match"),
        ];
        for (user, pass, expected) in cases {
            let mut store = Storefront::default();
            store.navigate(BASE, BASE).unwrap();
            store.fill("#user-name", user).unwrap();
            store.fill("#password", pass).unwrap();
            store.click(BASE, "#login-button").unwrap();
            assert_eq!(store.screen, Screen::Login);
            assert!(store.error.as_deref().unwrap().contains(expected));
            assert!(store.resolve(r#"[data-test="error"]"#).is_ok());
        }
    }

    #[test]
    fn test_navigate_rejects_foreign_hosts_and_unknown_paths() {
        let mut store = Storefront::default();
        let err = store.navigate(BASE, "https://example.com").unwrap_err();
        assert!(matches!(err, StepError::Navigation { .. }));

        let err = store
            .navigate(BASE, "https://www.saucedemo.com.evil.test")
            .unwrap_err();
        assert!(matches!(err, StepError::Navigation { .. }));

        let err = store.navigate(BASE, "https://www.saucedemo.com/nope").unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn test_deep_link_requires_login() {
        let mut store = Storefront::default();
        store
            .navigate(BASE, "https://www.saucedemo.com/inventory.html")
            .unwrap();
        assert_eq!(store.screen, Screen::Login);
        assert!(store.error.as_deref().unwrap().contains("when you are logged in"));
    }

    #[test]
    fn test_resolution_requires_exactly_one_match() {
        let store = logged_in();
        assert_eq!(
            store.resolve(".btn_inventory"),
            Err(StepError::not_found(".btn_inventory", 6))
        );
        assert_eq!(
            store.resolve("#missing"),
            Err(StepError::not_found("#missing", 0))
        );
    }

    #[test]
    fn test_fill_and_select_type_checks() {
        let mut store = logged_in();
        let err = store
            .fill(r#"[data-test="product-sort-container"]"#, "x")
            .unwrap_err();
        assert!(matches!(err, StepError::NotInteractable { .. }));

        let err = store.select_option(".shopping_cart_link", "az").unwrap_err();
        assert!(matches!(err, StepError::NotInteractable { .. }));

        let err = store
            .select_option(r#"[data-test="product-sort-container"]"#, "price")
            .unwrap_err();
        match err {
            StepError::InvalidOption { available, .. } => {
                assert_eq!(available, vec!["az", "za", "lohi", "hilo"]);
            }
            other => panic!("Expected InvalidOption, got {other:?}"),
        }
    }

    #[test]
    fn test_select_by_value_or_label_sorts_products() {
        let mut store = logged_in();
        let chosen = store
            .select_option(".product_sort_container", "Price (low to high)")
            .unwrap();
        assert_eq!(chosen.matched, "lohi");
        assert!(chosen.is_applied());
        assert_eq!(store.snapshot().products[0], "Sauce Labs Onesie");

        let chosen = store.select_option(".product_sort_container", "za").unwrap();
        assert_eq!(chosen.value, "za");
        assert_eq!(store.snapshot().products[0], "Test.allTheThings() T-Shirt (Red)");
    }

    #[test]
    fn test_cart_flow() {
        let mut store = logged_in();
        store
            .click(BASE, r#"[data-test="add-to-cart-sauce-labs-backpack"]"#)
            .unwrap();
        // Add button is replaced by Remove
        assert!(store
            .resolve(r#"[data-test="add-to-cart-sauce-labs-backpack"]"#)
            .is_err());
        store.click(BASE, ".shopping_cart_link").unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.screen, "cart");
        assert_eq!(snapshot.cart_badge, Some(1));
        assert_eq!(snapshot.cart_items, vec!["Sauce Labs Backpack"]);
    }

    #[tokio::test]
    async fn test_sessions_start_clean_and_close_once() {
        let driver = SimulatedDriver::new(BASE);
        let probe = driver.probe();

        let mut first = driver.open().await.unwrap();
        first.navigate(BASE).await.unwrap();
        first.close().await.unwrap();
        assert!(first.close().await.is_err());

        let mut second = driver.open().await.unwrap();
        let err = second.click("#login-button").await.unwrap_err();
        assert_eq!(err, StepError::not_found("#login-button", 0));
        second.close().await.unwrap();

        assert_eq!(probe.opened(), 2);
        assert_eq!(probe.closed(), 2);
        assert_eq!(
            probe.actions(),
            vec!["navigate https://www.saucedemo.com", "click #login-button"]
        );
    }
}
