use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shop::ShopId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantId(pub String);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub shop_id: ShopId,
    pub name: String,
    pub category: String,
    pub price: Decimal,
    pub old_price: Option<Decimal>,
    pub quantity: u32,
    pub low_stock_threshold: u32,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn is_on_sale(&self) -> bool {
        matches!(self.old_price, Some(old) if old > self.price)
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.quantity == 0
    }

    /// At-or-below threshold counts as low; a threshold of 0 only fires once
    /// the product is sold out.
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.low_stock_threshold
    }
}

/// One sellable variation of a product ("Size" = "Large") with its own stock
/// pool and a price delta against the base product.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub name: String,
    pub value: String,
    pub price_adjustment: Decimal,
    pub quantity: u32,
}

impl ProductVariant {
    pub fn effective_price(&self, base_price: Decimal) -> Decimal {
        base_price + self.price_adjustment
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.quantity == 0
    }

    pub fn label(&self) -> String {
        format!("{}: {}", self.name, self.value)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::domain::shop::ShopId;

    use super::{Product, ProductId, ProductVariant, VariantId};

    fn product(quantity: u32, threshold: u32) -> Product {
        Product {
            id: ProductId("P-1".to_string()),
            shop_id: ShopId("S-1".to_string()),
            name: "Ceramic Mug".to_string(),
            category: "Home & Garden".to_string(),
            price: Decimal::new(1_250, 2),
            old_price: None,
            quantity,
            low_stock_threshold: threshold,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn low_stock_boundary_is_inclusive() {
        assert!(product(5, 5).is_low_stock());
        assert!(product(0, 5).is_low_stock());
        assert!(!product(6, 5).is_low_stock());
    }

    #[test]
    fn sale_requires_old_price_above_current() {
        let mut p = product(10, 5);
        assert!(!p.is_on_sale());
        p.old_price = Some(Decimal::new(1_000, 2));
        assert!(!p.is_on_sale());
        p.old_price = Some(Decimal::new(1_500, 2));
        assert!(p.is_on_sale());
    }

    #[test]
    fn variant_adjusts_base_price() {
        let variant = ProductVariant {
            id: VariantId("V-1".to_string()),
            product_id: ProductId("P-1".to_string()),
            name: "Size".to_string(),
            value: "Large".to_string(),
            price_adjustment: Decimal::new(200, 2),
            quantity: 3,
        };

        assert_eq!(variant.effective_price(Decimal::new(1_250, 2)), Decimal::new(1_450, 2));
        assert_eq!(variant.label(), "Size: Large");
        assert!(!variant.is_out_of_stock());
    }
}
