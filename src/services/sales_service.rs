// src/services/sales_service.rs

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{AppError, Resource},
    db::{CrmRepository, SalesRepository},
    models::sales::{
        CreateProductPayload, CreateSalePayload, PricedLine, Product, Sale, SaleDetail,
        SaleItemPayload,
    },
};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Largest value a NUMERIC(16, 2) column holds.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_874_919_423, 2_328_306, 0, false, 2);

fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn within_column(value: Decimal) -> Result<Decimal, AppError> {
    if value > MAX_AMOUNT {
        return Err(AppError::BadRequest("invalid_amount"));
    }
    Ok(value)
}

/// Prices are stored with two decimals and may not be negative.
pub fn check_price(price: Decimal) -> Result<Decimal, AppError> {
    if price < Decimal::ZERO {
        return Err(AppError::BadRequest("invalid_price"));
    }
    within_column(round_cents(price))
}

/// quantity × unit_price × (1 − discount/100), rounded half away from zero to 2 places.
pub fn line_total(quantity: i32, unit_price: Decimal, discount: Decimal) -> Result<Decimal, AppError> {
    let net = Decimal::from(quantity)
        .checked_mul(unit_price)
        .and_then(|gross| HUNDRED.checked_sub(discount).and_then(|rest| gross.checked_mul(rest)))
        .and_then(|scaled| scaled.checked_div(HUNDRED))
        .ok_or(AppError::BadRequest("invalid_amount"))?;
    within_column(round_cents(net))
}

pub fn sale_total(lines: &[PricedLine]) -> Result<Decimal, AppError> {
    let total = lines
        .iter()
        .try_fold(Decimal::ZERO, |acc, l| acc.checked_add(l.line_total))
        .ok_or(AppError::BadRequest("invalid_amount"))?;
    within_column(total)
}

/// Resolves prices against the catalog and computes each line.
pub fn price_lines(
    items: &[SaleItemPayload],
    products: &HashMap<Uuid, Product>,
) -> Result<Vec<PricedLine>, AppError> {
    if items.is_empty() {
        return Err(AppError::BadRequest("empty_sale"));
    }

    items
        .iter()
        .map(|item| {
            if item.quantity < 1 {
                return Err(AppError::BadRequest("invalid_quantity"));
            }
            // sale_items.discount is NUMERIC(5, 2)
            let discount = round_cents(item.discount);
            if discount < Decimal::ZERO || discount > HUNDRED {
                return Err(AppError::BadRequest("invalid_discount"));
            }

            let product = products
                .get(&item.product_id)
                .ok_or(AppError::ResourceNotFound(Resource::Product))?;
            let unit_price = check_price(item.unit_price.unwrap_or(product.price))?;

            Ok(PricedLine {
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price,
                discount,
                line_total: line_total(item.quantity, unit_price, discount)?,
            })
        })
        .collect()
}

#[derive(Clone)]
pub struct SalesService {
    sales_repo: SalesRepository,
    crm_repo: CrmRepository,
    pool: PgPool,
}

impl SalesService {
    pub fn new(sales_repo: SalesRepository, crm_repo: CrmRepository, pool: PgPool) -> Self {
        Self {
            sales_repo,
            crm_repo,
            pool,
        }
    }

    pub async fn list_products(&self) -> Result<Vec<Product>, AppError> {
        self.sales_repo.list_products().await
    }

    pub async fn create_product(&self, input: &CreateProductPayload) -> Result<Product, AppError> {
        input.validate()?;
        let price = check_price(input.price)?;
        self.sales_repo.create_product(input, price).await
    }

    /// `sold_by = None` for managers.
    pub async fn list_sales(&self, sold_by: Option<Uuid>) -> Result<Vec<Sale>, AppError> {
        self.sales_repo.list_sales(sold_by).await
    }

    pub async fn get_sale(&self, id: Uuid, user_id: Uuid, is_manager: bool) -> Result<SaleDetail, AppError> {
        let sale = self
            .sales_repo
            .find_sale(id)
            .await?
            .filter(|s| is_manager || s.sold_by == user_id)
            .ok_or(AppError::ResourceNotFound(Resource::Sale))?;

        let items = self.sales_repo.list_items(sale.id).await?;
        Ok(SaleDetail { sale, items })
    }

    /// Header and items are written in one transaction.
    pub async fn create_sale(&self, seller_id: Uuid, input: &CreateSalePayload) -> Result<SaleDetail, AppError> {
        let mut tx = self.pool.begin().await?;

        // 1. References
        if !self.crm_repo.customer_exists(&mut *tx, input.customer_id).await? {
            return Err(AppError::ResourceNotFound(Resource::Customer));
        }
        if let Some(deal_id) = input.deal_id {
            if !self.crm_repo.deal_exists(&mut *tx, deal_id).await? {
                return Err(AppError::ResourceNotFound(Resource::Deal));
            }
        }

        // 2. Prices
        let ids: Vec<Uuid> = input.items.iter().map(|i| i.product_id).collect();
        let products: HashMap<Uuid, Product> = self
            .sales_repo
            .find_products(&mut *tx, &ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let lines = price_lines(&input.items, &products)?;
        let total = sale_total(&lines)?;
        let sale_date = input.sale_date.unwrap_or_else(|| Utc::now().date_naive());

        // 3. Header, then items
        let sale = self
            .sales_repo
            .insert_sale(
                &mut *tx,
                input.customer_id,
                input.deal_id,
                seller_id,
                total,
                input.notes.as_deref(),
                sale_date,
            )
            .await?;

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            items.push(self.sales_repo.insert_item(&mut *tx, sale.id, line).await?);
        }

        tx.commit().await?;

        tracing::info!(sale_id = %sale.id, %total, lines = items.len(), "sale recorded");
        Ok(SaleDetail { sale, items })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn product(price: &str) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: "اشتراک".into(),
            sku: None,
            price: dec(price),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn item(product_id: Uuid, quantity: i32, unit_price: Option<&str>, discount: &str) -> SaleItemPayload {
        SaleItemPayload {
            product_id,
            quantity,
            unit_price: unit_price.map(dec),
            discount: dec(discount),
        }
    }

    #[test]
    fn line_total_applies_percent_discount() {
        assert_eq!(line_total(2, dec("100"), dec("10")).unwrap(), dec("180.00"));
        assert_eq!(line_total(1, dec("99.99"), dec("0")).unwrap(), dec("99.99"));
        assert_eq!(line_total(3, dec("10"), dec("100")).unwrap(), dec("0"));
        // 1 × 0.125 → 0.13
        assert_eq!(line_total(1, dec("0.125"), dec("0")).unwrap(), dec("0.13"));
    }

    #[test]
    fn total_is_the_sum_of_rounded_lines() {
        let a = product("1000");
        let b = product("33.33");
        let products: HashMap<Uuid, Product> =
            [(a.id, a.clone()), (b.id, b.clone())].into_iter().collect();

        let lines = price_lines(
            &[item(a.id, 2, None, "10"), item(b.id, 3, Some("10.005"), "0")],
            &products,
        )
        .unwrap();

        assert_eq!(lines[0].unit_price, dec("1000"));
        assert_eq!(lines[0].line_total, dec("1800"));
        // 10.005 is stored as 10.01
        assert_eq!(lines[1].unit_price, dec("10.01"));
        assert_eq!(lines[1].line_total, dec("30.03"));
        assert_eq!(sale_total(&lines).unwrap(), dec("1830.03"));
    }

    #[test]
    fn huge_amounts_are_refused_instead_of_overflowing() {
        assert!(matches!(
            line_total(1_000_000, dec("1000000000000000000000000"), dec("0")),
            Err(AppError::BadRequest("invalid_amount"))
        ));
        assert!(matches!(
            line_total(2, MAX_AMOUNT, dec("0")),
            Err(AppError::BadRequest("invalid_amount"))
        ));
        assert_eq!(line_total(1, MAX_AMOUNT, dec("0")).unwrap(), dec("99999999999999.99"));

        let p = product("1");
        let products: HashMap<Uuid, Product> = [(p.id, p.clone())].into_iter().collect();
        assert!(matches!(
            price_lines(&[item(p.id, 1, Some("100000000000000"), "0")], &products),
            Err(AppError::BadRequest("invalid_amount"))
        ));

        let half = PricedLine {
            product_id: p.id,
            quantity: 1,
            unit_price: MAX_AMOUNT,
            discount: Decimal::ZERO,
            line_total: MAX_AMOUNT,
        };
        assert!(matches!(
            sale_total(&[half.clone(), half]),
            Err(AppError::BadRequest("invalid_amount"))
        ));
    }

    #[test]
    fn negative_prices_are_rejected() {
        let p = product("10");
        let products: HashMap<Uuid, Product> = [(p.id, p.clone())].into_iter().collect();

        assert!(matches!(
            price_lines(&[item(p.id, 3, Some("-500"), "0")], &products),
            Err(AppError::BadRequest("invalid_price"))
        ));
        assert!(matches!(
            check_price(dec("-0.01")),
            Err(AppError::BadRequest("invalid_price"))
        ));
        assert_eq!(check_price(dec("0")).unwrap(), dec("0"));
        assert_eq!(check_price(dec("19.999")).unwrap(), dec("20.00"));
    }

    #[test]
    fn discount_is_priced_at_stored_precision() {
        let p = product("100");
        let products: HashMap<Uuid, Product> = [(p.id, p.clone())].into_iter().collect();

        let lines = price_lines(&[item(p.id, 1, None, "12.345")], &products).unwrap();
        assert_eq!(lines[0].discount, dec("12.35"));
        assert_eq!(lines[0].line_total, dec("87.65"));

        // 100.004 rounds to 100.00 and stays in range
        let lines = price_lines(&[item(p.id, 1, None, "100.004")], &products).unwrap();
        assert_eq!(lines[0].line_total, dec("0"));
    }

    #[test]
    fn invalid_lines_are_rejected() {
        let p = product("10");
        let products: HashMap<Uuid, Product> = [(p.id, p.clone())].into_iter().collect();

        assert!(matches!(
            price_lines(&[], &products),
            Err(AppError::BadRequest("empty_sale"))
        ));
        assert!(matches!(
            price_lines(&[item(p.id, 0, None, "0")], &products),
            Err(AppError::BadRequest("invalid_quantity"))
        ));
        assert!(matches!(
            price_lines(&[item(p.id, 1, None, "101")], &products),
            Err(AppError::BadRequest("invalid_discount"))
        ));
        assert!(matches!(
            price_lines(&[item(Uuid::new_v4(), 1, None, "0")], &products),
            Err(AppError::ResourceNotFound(Resource::Product))
        ));
    }
}
