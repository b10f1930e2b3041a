use chrono::{DateTime, Utc};

use orderflow_domain::id::OrderId;
use orderflow_domain::order::OrderStatus;

/// Column limits of the `orders` table.
pub const MAX_EMAIL_LEN: usize = 200;
pub const MAX_PRODUCT_CODE_LEN: usize = 100;

/// An order owned by the orders service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub customer_email: String,
    pub product_code: String,
    pub quantity: i32,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// Collect every validation failure for an order request. Empty means valid.
pub fn validate_order(customer_email: &str, product_code: &str, quantity: i32) -> Vec<&'static str> {
    let mut errors = Vec::new();

    let email = customer_email.trim();
    if email.is_empty() {
        errors.push("Email is required");
    } else if !is_email(email) {
        errors.push("Invalid email format");
    } else if email.len() > MAX_EMAIL_LEN {
        errors.push("Email must be at most 200 characters");
    }

    let product_code = product_code.trim();
    if product_code.is_empty() {
        errors.push("Product code is required");
    } else if product_code.len() > MAX_PRODUCT_CODE_LEN {
        errors.push("Product code must be at most 100 characters");
    }

    if quantity <= 0 {
        errors.push("Quantity must be greater than zero");
    }

    errors
}

/// One `@` with something on both sides and no whitespace.
fn is_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}
