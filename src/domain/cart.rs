//! Cart engine: line selection, ownership, and the priced summary.
//!
//! All the arithmetic lives here, on already-resolved prices, so it can be
//! tested without a database. The service layer is responsible for fetching
//! rows and resolving variant/design prices before calling in.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::PricingConfig;
use crate::domain::catalog::PlacementLocation;

/// A cart row belongs to exactly one of a registered user or an anonymous
/// browsing session, never both.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CartOwner {
    User(i64),
    Session(String),
}

impl CartOwner {
    pub fn user_id(&self) -> Option<i64> {
        match self {
            CartOwner::User(id) => Some(*id),
            CartOwner::Session(_) => None,
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        match self {
            CartOwner::User(_) => None,
            CartOwner::Session(id) => Some(id.as_str()),
        }
    }

    /// Row-level access predicate: the row belongs to this identity exactly
    /// when its owner columns match. Used before any mutation by item id.
    pub fn owns(&self, user_id: Option<i64>, session_id: Option<&str>) -> bool {
        match self {
            CartOwner::User(id) => user_id == Some(*id),
            CartOwner::Session(id) => session_id == Some(id.as_str()),
        }
    }
}

impl std::fmt::Display for CartOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CartOwner::User(id) => write!(f, "user:{id}"),
            CartOwner::Session(id) => write!(f, "session:{id}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("placement location requires a design")]
    PlacementWithoutDesign,
}

/// What the customer picked: a garment variant in a size, optionally with
/// an embroidery design at a placement. Two cart rows are the same line
/// exactly when all four fields match (including both options being absent).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSelection {
    pub variant_id: i64,
    pub size: String,
    pub design_id: Option<i64>,
    pub placement_location: Option<PlacementLocation>,
}

impl ItemSelection {
    /// A placement only makes sense when a design is chosen.
    pub fn ensure_coherent(&self) -> Result<(), SelectionError> {
        if self.design_id.is_none() && self.placement_location.is_some() {
            return Err(SelectionError::PlacementWithoutDesign);
        }
        Ok(())
    }

    pub fn matches(&self, other: &ItemSelection) -> bool {
        self == other
    }
}

/// One cart row with its prices resolved from the current catalog.
#[derive(Clone, Debug, Serialize)]
pub struct CartLine {
    pub id: i64,
    #[serde(flatten)]
    pub selection: ItemSelection,
    pub quantity: i32,
    pub product_name: String,
    pub color_name: String,
    pub image_url: String,
    pub design_name: Option<String>,
    pub design_preview_url: Option<String>,
    pub unit_product_price: Decimal,
    pub unit_design_price: Decimal,
}

impl CartLine {
    pub fn line_total(&self) -> Decimal {
        (self.unit_product_price + self.unit_design_price) * Decimal::from(self.quantity)
    }
}

/// Derived view of a cart; recomputed on every read, never stored.
#[derive(Clone, Debug, Serialize)]
pub struct CartSummary {
    pub items: Vec<CartLine>,
    pub subtotal: Decimal,
    pub delivery_price: Decimal,
    pub total: Decimal,
    pub free_delivery_threshold: Decimal,
    pub amount_to_free_delivery: Decimal,
}

impl CartSummary {
    pub fn build(items: Vec<CartLine>, pricing: &PricingConfig) -> Self {
        let subtotal: Decimal = items.iter().map(CartLine::line_total).sum();
        let delivery_price = pricing.delivery_fee(subtotal);
        Self {
            subtotal,
            delivery_price,
            total: subtotal + delivery_price,
            free_delivery_threshold: pricing.free_delivery_threshold,
            amount_to_free_delivery: pricing.amount_to_free_delivery(subtotal),
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(
        id: i64,
        quantity: i32,
        product_price: i64,
        design_price: i64,
        selection: ItemSelection,
    ) -> CartLine {
        CartLine {
            id,
            selection,
            quantity,
            product_name: "240 GSM T-Shirt".into(),
            color_name: "Navy Blue".into(),
            image_url: "/img/navy-front.png".into(),
            design_name: (design_price > 0).then(|| "Aqtau".into()),
            design_preview_url: (design_price > 0).then(|| "/img/aqtau.png".into()),
            unit_product_price: Decimal::from(product_price),
            unit_design_price: Decimal::from(design_price),
        }
    }

    fn plain(variant_id: i64, size: &str) -> ItemSelection {
        ItemSelection {
            variant_id,
            size: size.into(),
            design_id: None,
            placement_location: None,
        }
    }

    #[test]
    fn line_total_includes_design_price() {
        let sel = ItemSelection {
            design_id: Some(7),
            placement_location: Some(PlacementLocation::Chest),
            ..plain(1, "L")
        };
        let l = line(1, 2, 10000, 3000, sel);
        assert_eq!(l.line_total(), Decimal::from(26000));
    }

    #[test]
    fn summary_below_threshold_charges_flat_delivery() {
        // variant A, base 10000, size L, qty 2, no design
        let summary = CartSummary::build(
            vec![line(1, 2, 10000, 0, plain(1, "L"))],
            &PricingConfig::default(),
        );
        assert_eq!(summary.subtotal, Decimal::from(20000));
        assert_eq!(summary.delivery_price, Decimal::from(1500));
        assert_eq!(summary.total, Decimal::from(21500));
        assert_eq!(summary.amount_to_free_delivery, Decimal::from(5000));
    }

    #[test]
    fn design_line_still_below_threshold() {
        let sel = ItemSelection {
            design_id: Some(7),
            placement_location: Some(PlacementLocation::Heart),
            ..plain(1, "L")
        };
        let summary = CartSummary::build(
            vec![line(1, 2, 10000, 0, plain(1, "L")), line(2, 1, 0, 3000, sel)],
            &PricingConfig::default(),
        );
        assert_eq!(summary.subtotal, Decimal::from(23000));
        assert_eq!(summary.delivery_price, Decimal::from(1500));
    }

    #[test]
    fn summary_at_threshold_waives_delivery() {
        // qty 5 of the 10000 garment plus a 3000 design line: 53000 >= 25000
        let sel = ItemSelection {
            design_id: Some(7),
            placement_location: Some(PlacementLocation::Heart),
            ..plain(1, "L")
        };
        let summary = CartSummary::build(
            vec![line(1, 5, 10000, 0, plain(1, "L")), line(2, 1, 0, 3000, sel)],
            &PricingConfig::default(),
        );
        assert_eq!(summary.subtotal, Decimal::from(53000));
        assert_eq!(summary.delivery_price, Decimal::ZERO);
        assert_eq!(summary.total, Decimal::from(53000));
        assert_eq!(summary.amount_to_free_delivery, Decimal::ZERO);
    }

    #[test]
    fn empty_cart_summary() {
        let summary = CartSummary::build(vec![], &PricingConfig::default());
        assert_eq!(summary.subtotal, Decimal::ZERO);
        assert_eq!(summary.delivery_price, Decimal::from(1500));
        assert_eq!(summary.amount_to_free_delivery, Decimal::from(25000));
    }

    #[test]
    fn selection_matching_is_exact_on_all_fields() {
        let a = plain(1, "L");
        assert!(a.matches(&plain(1, "L")));
        assert!(!a.matches(&plain(1, "M")));
        assert!(!a.matches(&plain(2, "L")));
        let with_design = ItemSelection {
            design_id: Some(7),
            placement_location: Some(PlacementLocation::Back),
            ..plain(1, "L")
        };
        assert!(!a.matches(&with_design));
        let other_placement = ItemSelection {
            placement_location: Some(PlacementLocation::Chest),
            ..with_design.clone()
        };
        assert!(!with_design.matches(&other_placement));
    }

    #[test]
    fn placement_without_design_is_rejected() {
        let sel = ItemSelection {
            placement_location: Some(PlacementLocation::Chest),
            ..plain(1, "L")
        };
        assert!(matches!(
            sel.ensure_coherent(),
            Err(SelectionError::PlacementWithoutDesign)
        ));
        assert!(plain(1, "L").ensure_coherent().is_ok());
    }

    #[test]
    fn owner_is_user_xor_session() {
        let user = CartOwner::User(42);
        assert_eq!(user.user_id(), Some(42));
        assert_eq!(user.session_id(), None);
        let session = CartOwner::Session("abc".into());
        assert_eq!(session.user_id(), None);
        assert_eq!(session.session_id(), Some("abc"));
    }

    #[test]
    fn ownership_predicate_requires_exact_identity() {
        let user = CartOwner::User(1);
        assert!(user.owns(Some(1), None));
        assert!(!user.owns(Some(2), None));
        assert!(!user.owns(None, Some("s1")));
        assert!(!user.owns(None, None));

        let guest = CartOwner::Session("s1".into());
        assert!(guest.owns(None, Some("s1")));
        assert!(!guest.owns(None, Some("s2")));
        assert!(!guest.owns(Some(1), None));
        assert!(!guest.owns(None, None));
    }
}
