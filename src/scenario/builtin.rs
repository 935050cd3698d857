//! Built-in storefront scenarios
//!
//! Recorded flows against the Swag Labs demo store, kept as literal data.

use std::path::PathBuf;

use chrono::NaiveDate;
use uuid::Uuid;

use super::{Scenario, ScenarioId, Step};

pub const STOREFRONT_URL: &str = "https://www.saucedemo.com";

pub const USERNAME_INPUT: &str = r#"[data-test="username"]"#;
pub const PASSWORD_INPUT: &str = r#"[data-test="password"]"#;
pub const LOGIN_BUTTON: &str = r#"[data-test="login-button"]"#;
pub const SORT_SELECT: &str = r#"[data-test="product-sort-container"]"#;
pub const ADD_BACKPACK_BUTTON: &str = r#"[data-test="add-to-cart-sauce-labs-backpack"]"#;
pub const CART_LINK: &str = ".shopping_cart_link";

pub const VALID_USERNAME: &str = "standard_user";
pub const VALID_PASSWORD: &str = "secret_sauce";

fn recorded(name: &str, uuid: u128) -> ScenarioId {
    ScenarioId::new(name)
        .generated_on(NaiveDate::from_ymd_opt(2025, 8, 15))
        .with_uuid(Uuid::from_u128(uuid))
}

fn navigate(url: &str) -> Step {
    Step::Navigate {
        url: url.to_string(),
    }
}

fn fill(selector: &str, value: &str) -> Step {
    Step::Fill {
        selector: selector.to_string(),
        value: value.to_string(),
    }
}

fn click(selector: &str) -> Step {
    Step::Click {
        selector: selector.to_string(),
    }
}

fn select(selector: &str, value: &str) -> Step {
    Step::SelectOption {
        selector: selector.to_string(),
        value: value.to_string(),
    }
}

fn screenshot(path: &str) -> Step {
    Step::Screenshot {
        path: PathBuf::from(path),
    }
}

fn login() -> Vec<Step> {
    vec![
        navigate(STOREFRONT_URL),
        fill(USERNAME_INPUT, VALID_USERNAME),
        fill(PASSWORD_INPUT, VALID_PASSWORD),
        click(LOGIN_BUTTON),
    ]
}

/// TC_AUTH_01: log in with valid credentials and capture the products page
pub fn valid_login() -> Scenario {
    let mut steps = login();
    steps.push(screenshot("products_page_verified.png"));

    Scenario::new(
        recorded("TC_AUTH_01_ValidLogin", 0xb4dbfafd_aabb_442c_a1d3_975ca5943002),
        steps,
    )
    .with_description("Login with valid credentials lands on the Products page")
}

/// TC_INV_02: sort the inventory by name, A to Z
pub fn sort_products() -> Scenario {
    let mut steps = login();
    steps.push(select(SORT_SELECT, "az"));
    steps.push(screenshot("products_sorted_a_to_z.png"));

    Scenario::new(
        recorded("TC_INV_02_SortProducts", 0x759ad114_4de3_4f88_b053_67fefcb658b6),
        steps,
    )
    .with_description("Products sorted by name (A to Z)")
}

/// TC_CART_01: add the backpack and open the cart
pub fn view_cart() -> Scenario {
    let mut steps = login();
    steps.push(click(ADD_BACKPACK_BUTTON));
    steps.push(click(CART_LINK));
    steps.push(screenshot("your_cart_displayed.png"));

    Scenario::new(
        recorded(
            "TC_CART_01_ViewCartContents",
            0xd41868c4_f7b0_4668_9271_ae2ba28d6d19,
        ),
        steps,
    )
    .with_description("Cart page shows the selected item")
}

/// Login, sort and cart in a single session
pub fn ecommerce_flow() -> Scenario {
    let mut steps = login();
    steps.extend([
        screenshot("successful_login_verification.png"),
        select(SORT_SELECT, "az"),
        click(ADD_BACKPACK_BUTTON),
        click(CART_LINK),
        screenshot("cart_page_verification.png"),
    ]);

    Scenario::new(
        recorded("ECommerce_MCP_Generated", 0xef4f6c57_f123_470b_bd0f_1ba9fa5e55bd),
        steps,
    )
    .with_description("Login, sort, add to cart and view cart")
}

/// Every built-in scenario, in catalog order
pub fn all() -> Vec<Scenario> {
    vec![valid_login(), sort_products(), view_cart(), ecommerce_flow()]
}

/// Find a built-in scenario by name, title or file stem
pub fn find(query: &str) -> Option<Scenario> {
    all().into_iter().find(|s| s.matches(query))
}
