// src/db/sales_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::sales::{CreateProductPayload, PricedLine, Product, Sale, SaleItem},
};

#[derive(Clone)]
pub struct SalesRepository {
    pool: PgPool,
}

impl SalesRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  PRODUCTS
    // =========================================================================

    pub async fn list_products(&self) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE is_active = TRUE ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    pub async fn create_product(&self, input: &CreateProductPayload, price: Decimal) -> Result<Product, AppError> {
        let product = sqlx::query_as::<_, Product>(
            "INSERT INTO products (name, sku, price) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(input.name.trim())
        .bind(input.sku.as_deref().map(str::trim))
        .bind(price)
        .fetch_one(&self.pool)
        .await?;
        Ok(product)
    }

    /// Products among `ids`, missing ones simply absent from the result.
    pub async fn find_products<'e, E>(&self, executor: E, ids: &[Uuid]) -> Result<Vec<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let products = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(executor)
            .await?;
        Ok(products)
    }

    // =========================================================================
    //  SALES
    // =========================================================================

    /// `sold_by = None` lists every sale (managers).
    pub async fn list_sales(&self, sold_by: Option<Uuid>) -> Result<Vec<Sale>, AppError> {
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT * FROM sales
            WHERE ($1::uuid IS NULL OR sold_by = $1)
            ORDER BY sale_date DESC, created_at DESC
            "#,
        )
        .bind(sold_by)
        .fetch_all(&self.pool)
        .await?;
        Ok(sales)
    }

    pub async fn find_sale(&self, id: Uuid) -> Result<Option<Sale>, AppError> {
        let sale = sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(sale)
    }

    pub async fn list_items(&self, sale_id: Uuid) -> Result<Vec<SaleItem>, AppError> {
        let items = sqlx::query_as::<_, SaleItem>("SELECT * FROM sale_items WHERE sale_id = $1")
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    pub async fn insert_sale<'e, E>(
        &self,
        executor: E,
        customer_id: Uuid,
        deal_id: Option<Uuid>,
        sold_by: Uuid,
        total_amount: Decimal,
        notes: Option<&str>,
        sale_date: NaiveDate,
    ) -> Result<Sale, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            INSERT INTO sales (customer_id, deal_id, sold_by, total_amount, notes, sale_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(customer_id)
        .bind(deal_id)
        .bind(sold_by)
        .bind(total_amount)
        .bind(notes)
        .bind(sale_date)
        .fetch_one(executor)
        .await?;
        Ok(sale)
    }

    pub async fn insert_item<'e, E>(
        &self,
        executor: E,
        sale_id: Uuid,
        line: &PricedLine,
    ) -> Result<SaleItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, SaleItem>(
            r#"
            INSERT INTO sale_items (sale_id, product_id, quantity, unit_price, discount, line_total)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(sale_id)
        .bind(line.product_id)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.discount)
        .bind(line.line_total)
        .fetch_one(executor)
        .await?;
        Ok(item)
    }
}
