// src/db/crm_repo.rs

use sqlx::{PgPool, Postgres, Executor};
use uuid::Uuid;

use crate::{
    common::error::{map_unique_email, AppError},
    models::crm::{
        Company, CompanyFilter, CompanyWithContacts, Contact, ContactFilter, CreateCompanyPayload,
        CreateContactPayload, CreateCustomerPayload, CreateDealPayload, Customer, CustomerFilter,
        CustomerStatus, Deal, DealFilter, DealStage, UpdateCompanyPayload, UpdateContactPayload,
        UpdateCustomerPayload, UpdateDealPayload,
    },
};

// Search terms are matched as substrings, case-insensitive
fn like_pattern(q: Option<&str>) -> Option<String> {
    q.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", s.replace('%', "\\%").replace('_', "\\_")))
}

#[derive(Clone)]
pub struct CrmRepository {
    pool: PgPool,
}

impl CrmRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // =========================================================================
    //  CUSTOMERS
    // =========================================================================

    pub async fn list_customers(&self, filter: &CustomerFilter) -> Result<Vec<Customer>, AppError> {
        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT * FROM customers
            WHERE ($1::text IS NULL OR name ILIKE $1 OR email ILIKE $1 OR phone ILIKE $1)
              AND ($2::customer_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(like_pattern(filter.q.as_deref()))
        .bind(filter.status)
        .fetch_all(&self.pool)
        .await?;
        Ok(customers)
    }

    pub async fn find_customer(&self, id: Uuid) -> Result<Option<Customer>, AppError> {
        let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(customer)
    }

    pub async fn customer_exists<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM customers WHERE id = $1)")
                .bind(id)
                .fetch_one(executor)
                .await?;
        Ok(exists)
    }

    pub async fn create_customer(
        &self,
        input: &CreateCustomerPayload,
        assigned_to: Option<Uuid>,
    ) -> Result<Customer, AppError> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (name, email, phone, segment, status, assigned_to, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(input.name.trim())
        .bind(input.email.as_deref())
        .bind(input.phone.as_deref())
        .bind(input.segment.as_deref())
        .bind(input.status.unwrap_or(CustomerStatus::Active))
        .bind(assigned_to)
        .bind(input.notes.as_deref())
        .fetch_one(&self.pool)
        .await?;
        Ok(customer)
    }

    pub async fn update_customer(
        &self,
        id: Uuid,
        input: &UpdateCustomerPayload,
    ) -> Result<Option<Customer>, AppError> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            UPDATE customers SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone),
                segment = COALESCE($5, segment),
                status = COALESCE($6, status),
                assigned_to = COALESCE($7, assigned_to),
                notes = COALESCE($8, notes),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.name.as_deref().map(str::trim))
        .bind(input.email.as_deref())
        .bind(input.phone.as_deref())
        .bind(input.segment.as_deref())
        .bind(input.status)
        .bind(input.assigned_to)
        .bind(input.notes.as_deref())
        .fetch_optional(&self.pool)
        .await?;
        Ok(customer)
    }

    pub async fn delete_customer(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  COMPANIES
    // =========================================================================

    pub async fn list_companies(
        &self,
        filter: &CompanyFilter,
    ) -> Result<Vec<CompanyWithContacts>, AppError> {
        let companies = sqlx::query_as::<_, CompanyWithContacts>(
            r#"
            SELECT c.*, COUNT(ct.id) AS contact_count
            FROM companies c
            LEFT JOIN contacts ct ON ct.company_id = c.id
            WHERE ($1::text IS NULL OR c.name ILIKE $1 OR c.industry ILIKE $1)
            GROUP BY c.id
            ORDER BY c.name ASC
            "#,
        )
        .bind(like_pattern(filter.q.as_deref()))
        .fetch_all(&self.pool)
        .await?;
        Ok(companies)
    }

    pub async fn find_company(&self, id: Uuid) -> Result<Option<CompanyWithContacts>, AppError> {
        let company = sqlx::query_as::<_, CompanyWithContacts>(
            r#"
            SELECT c.*, (SELECT COUNT(*) FROM contacts ct WHERE ct.company_id = c.id) AS contact_count
            FROM companies c
            WHERE c.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(company)
    }

    pub async fn company_exists(&self, id: Uuid) -> Result<bool, AppError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM companies WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    pub async fn create_company(
        &self,
        input: &CreateCompanyPayload,
        created_by: Uuid,
    ) -> Result<Company, AppError> {
        let company = sqlx::query_as::<_, Company>(
            r#"
            INSERT INTO companies (name, industry, website, phone, address, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(input.name.trim())
        .bind(input.industry.as_deref())
        .bind(input.website.as_deref())
        .bind(input.phone.as_deref())
        .bind(input.address.as_deref())
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(company)
    }

    pub async fn update_company(
        &self,
        id: Uuid,
        input: &UpdateCompanyPayload,
    ) -> Result<Option<Company>, AppError> {
        let company = sqlx::query_as::<_, Company>(
            r#"
            UPDATE companies SET
                name = COALESCE($2, name),
                industry = COALESCE($3, industry),
                website = COALESCE($4, website),
                phone = COALESCE($5, phone),
                address = COALESCE($6, address),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.name.as_deref().map(str::trim))
        .bind(input.industry.as_deref())
        .bind(input.website.as_deref())
        .bind(input.phone.as_deref())
        .bind(input.address.as_deref())
        .fetch_optional(&self.pool)
        .await?;
        Ok(company)
    }

    pub async fn count_company_contacts(&self, company_id: Uuid) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contacts WHERE company_id = $1")
            .bind(company_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn delete_company(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM companies WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  CONTACTS
    // =========================================================================

    pub async fn list_contacts(&self, filter: &ContactFilter) -> Result<Vec<Contact>, AppError> {
        let contacts = sqlx::query_as::<_, Contact>(
            r#"
            SELECT * FROM contacts
            WHERE ($1::uuid IS NULL OR company_id = $1)
              AND ($2::text IS NULL
                   OR first_name ILIKE $2 OR last_name ILIKE $2 OR email ILIKE $2)
            ORDER BY last_name ASC, first_name ASC
            "#,
        )
        .bind(filter.company_id)
        .bind(like_pattern(filter.q.as_deref()))
        .fetch_all(&self.pool)
        .await?;
        Ok(contacts)
    }

    pub async fn find_contact(&self, id: Uuid) -> Result<Option<Contact>, AppError> {
        let contact = sqlx::query_as::<_, Contact>("SELECT * FROM contacts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(contact)
    }

    /// Case-insensitive email lookup, optionally ignoring one contact (the one being edited).
    pub async fn contact_email_taken(
        &self,
        email: &str,
        exclude_id: Option<Uuid>,
    ) -> Result<bool, AppError> {
        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM contacts
                WHERE LOWER(email) = LOWER($1)
                  AND ($2::uuid IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(email.trim())
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    pub async fn create_contact(
        &self,
        input: &CreateContactPayload,
        created_by: Uuid,
    ) -> Result<Contact, AppError> {
        let contact = sqlx::query_as::<_, Contact>(
            r#"
            INSERT INTO contacts (company_id, first_name, last_name, email, phone, job_title, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(input.company_id)
        .bind(input.first_name.trim())
        .bind(input.last_name.trim())
        .bind(input.email.as_deref().map(str::trim))
        .bind(input.phone.as_deref())
        .bind(input.job_title.as_deref())
        .bind(created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique_email)?;
        Ok(contact)
    }

    pub async fn update_contact(
        &self,
        id: Uuid,
        input: &UpdateContactPayload,
    ) -> Result<Option<Contact>, AppError> {
        let contact = sqlx::query_as::<_, Contact>(
            r#"
            UPDATE contacts SET
                company_id = COALESCE($2, company_id),
                first_name = COALESCE($3, first_name),
                last_name = COALESCE($4, last_name),
                email = COALESCE($5, email),
                phone = COALESCE($6, phone),
                job_title = COALESCE($7, job_title),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.company_id)
        .bind(input.first_name.as_deref().map(str::trim))
        .bind(input.last_name.as_deref().map(str::trim))
        .bind(input.email.as_deref().map(str::trim))
        .bind(input.phone.as_deref())
        .bind(input.job_title.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_unique_email)?;
        Ok(contact)
    }

    pub async fn delete_contact(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  DEALS
    // =========================================================================

    pub async fn list_deals(&self, filter: &DealFilter) -> Result<Vec<Deal>, AppError> {
        let deals = sqlx::query_as::<_, Deal>(
            r#"
            SELECT * FROM deals
            WHERE ($1::deal_stage IS NULL OR stage = $1)
              AND ($2::uuid IS NULL OR customer_id = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.stage)
        .bind(filter.customer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(deals)
    }

    pub async fn find_deal(&self, id: Uuid) -> Result<Option<Deal>, AppError> {
        let deal = sqlx::query_as::<_, Deal>("SELECT * FROM deals WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(deal)
    }

    pub async fn deal_exists<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM deals WHERE id = $1)")
            .bind(id)
            .fetch_one(executor)
            .await?;
        Ok(exists)
    }

    pub async fn create_deal(
        &self,
        input: &CreateDealPayload,
        assigned_to: Uuid,
    ) -> Result<Deal, AppError> {
        let deal = sqlx::query_as::<_, Deal>(
            r#"
            INSERT INTO deals (customer_id, title, stage, value, probability, expected_close_date, assigned_to)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(input.customer_id)
        .bind(input.title.trim())
        .bind(input.stage.unwrap_or(DealStage::Discovery))
        .bind(input.value)
        .bind(input.probability)
        .bind(input.expected_close_date)
        .bind(input.assigned_to.unwrap_or(assigned_to))
        .fetch_one(&self.pool)
        .await?;
        Ok(deal)
    }

    pub async fn update_deal(
        &self,
        id: Uuid,
        input: &UpdateDealPayload,
    ) -> Result<Option<Deal>, AppError> {
        let deal = sqlx::query_as::<_, Deal>(
            r#"
            UPDATE deals SET
                title = COALESCE($2, title),
                stage = COALESCE($3, stage),
                value = COALESCE($4, value),
                probability = COALESCE($5, probability),
                expected_close_date = COALESCE($6, expected_close_date),
                assigned_to = COALESCE($7, assigned_to),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.title.as_deref().map(str::trim))
        .bind(input.stage)
        .bind(input.value)
        .bind(input.probability)
        .bind(input.expected_close_date)
        .bind(input.assigned_to)
        .fetch_optional(&self.pool)
        .await?;
        Ok(deal)
    }

    pub async fn delete_deal(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM deals WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn search_terms_are_escaped_and_trimmed() {
        assert_eq!(like_pattern(Some("  نگین ")).as_deref(), Some("%نگین%"));
        assert_eq!(like_pattern(Some("50%_off")).as_deref(), Some("%50\\%\\_off%"));
        assert_eq!(like_pattern(Some("   ")), None);
        assert_eq!(like_pattern(None), None);
    }
}
