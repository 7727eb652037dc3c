// src/services/crm_service.rs

use uuid::Uuid;

use crate::{
    common::error::{AppError, Resource},
    db::{CrmRepository, UserRepository},
    models::crm::{
        Company, CompanyFilter, CompanyWithContacts, Contact, ContactFilter, CreateCompanyPayload,
        CreateContactPayload, CreateCustomerPayload, CreateDealPayload, Customer, CustomerFilter,
        Deal, DealFilter, UpdateCompanyPayload, UpdateContactPayload, UpdateCustomerPayload,
        UpdateDealPayload,
    },
};

#[derive(Clone)]
pub struct CrmService {
    crm_repo: CrmRepository,
    user_repo: UserRepository,
}

impl CrmService {
    pub fn new(crm_repo: CrmRepository, user_repo: UserRepository) -> Self {
        Self { crm_repo, user_repo }
    }

    async fn ensure_user(&self, id: Option<Uuid>) -> Result<(), AppError> {
        if let Some(id) = id {
            if !self.user_repo.exists(id).await? {
                return Err(AppError::ResourceNotFound(Resource::User));
            }
        }
        Ok(())
    }

    // =========================================================================
    //  CUSTOMERS
    // =========================================================================

    pub async fn list_customers(&self, filter: &CustomerFilter) -> Result<Vec<Customer>, AppError> {
        self.crm_repo.list_customers(filter).await
    }

    pub async fn get_customer(&self, id: Uuid) -> Result<Customer, AppError> {
        self.crm_repo
            .find_customer(id)
            .await?
            .ok_or(AppError::ResourceNotFound(Resource::Customer))
    }

    pub async fn create_customer(
        &self,
        actor_id: Uuid,
        input: &CreateCustomerPayload,
    ) -> Result<Customer, AppError> {
        self.ensure_user(input.assigned_to).await?;
        let assigned_to = input.assigned_to.or(Some(actor_id));
        self.crm_repo.create_customer(input, assigned_to).await
    }

    pub async fn update_customer(
        &self,
        id: Uuid,
        input: &UpdateCustomerPayload,
    ) -> Result<Customer, AppError> {
        self.ensure_user(input.assigned_to).await?;
        self.crm_repo
            .update_customer(id, input)
            .await?
            .ok_or(AppError::ResourceNotFound(Resource::Customer))
    }

    pub async fn delete_customer(&self, id: Uuid) -> Result<(), AppError> {
        if !self.crm_repo.delete_customer(id).await? {
            return Err(AppError::ResourceNotFound(Resource::Customer));
        }
        Ok(())
    }

    // =========================================================================
    //  COMPANIES
    // =========================================================================

    pub async fn list_companies(
        &self,
        filter: &CompanyFilter,
    ) -> Result<Vec<CompanyWithContacts>, AppError> {
        self.crm_repo.list_companies(filter).await
    }

    pub async fn get_company(&self, id: Uuid) -> Result<CompanyWithContacts, AppError> {
        self.crm_repo
            .find_company(id)
            .await?
            .ok_or(AppError::ResourceNotFound(Resource::Company))
    }

    pub async fn create_company(
        &self,
        actor_id: Uuid,
        input: &CreateCompanyPayload,
    ) -> Result<Company, AppError> {
        self.crm_repo.create_company(input, actor_id).await
    }

    pub async fn update_company(
        &self,
        id: Uuid,
        input: &UpdateCompanyPayload,
    ) -> Result<Company, AppError> {
        self.crm_repo
            .update_company(id, input)
            .await?
            .ok_or(AppError::ResourceNotFound(Resource::Company))
    }

    /// Refused while contacts still point at the company.
    pub async fn delete_company(&self, id: Uuid) -> Result<(), AppError> {
        if !self.crm_repo.company_exists(id).await? {
            return Err(AppError::ResourceNotFound(Resource::Company));
        }

        let contacts = self.crm_repo.count_company_contacts(id).await?;
        if contacts > 0 {
            return Err(AppError::CompanyHasContacts(contacts));
        }

        // A contact inserted in between trips the RESTRICT foreign key
        self.crm_repo.delete_company(id).await.map_err(|e| match e {
            AppError::DatabaseError(sqlx::Error::Database(db_err))
                if db_err.is_foreign_key_violation() =>
            {
                AppError::CompanyHasContacts(1)
            }
            other => other,
        })?;

        tracing::info!(company_id = %id, "company deleted");
        Ok(())
    }

    // =========================================================================
    //  CONTACTS
    // =========================================================================

    pub async fn list_contacts(&self, filter: &ContactFilter) -> Result<Vec<Contact>, AppError> {
        self.crm_repo.list_contacts(filter).await
    }

    pub async fn get_contact(&self, id: Uuid) -> Result<Contact, AppError> {
        self.crm_repo
            .find_contact(id)
            .await?
            .ok_or(AppError::ResourceNotFound(Resource::Contact))
    }

    async fn ensure_company(&self, company_id: Option<Uuid>) -> Result<(), AppError> {
        if let Some(id) = company_id {
            if !self.crm_repo.company_exists(id).await? {
                return Err(AppError::ResourceNotFound(Resource::Company));
            }
        }
        Ok(())
    }

    async fn ensure_email_free(&self, email: Option<&str>, exclude: Option<Uuid>) -> Result<(), AppError> {
        if let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) {
            if self.crm_repo.contact_email_taken(email, exclude).await? {
                return Err(AppError::EmailAlreadyExists);
            }
        }
        Ok(())
    }

    pub async fn create_contact(
        &self,
        actor_id: Uuid,
        input: &CreateContactPayload,
    ) -> Result<Contact, AppError> {
        self.ensure_email_free(input.email.as_deref(), None).await?;
        self.ensure_company(input.company_id).await?;
        self.crm_repo.create_contact(input, actor_id).await
    }

    pub async fn update_contact(
        &self,
        id: Uuid,
        input: &UpdateContactPayload,
    ) -> Result<Contact, AppError> {
        if self.crm_repo.find_contact(id).await?.is_none() {
            return Err(AppError::ResourceNotFound(Resource::Contact));
        }
        self.ensure_email_free(input.email.as_deref(), Some(id)).await?;
        self.ensure_company(input.company_id).await?;

        self.crm_repo
            .update_contact(id, input)
            .await?
            .ok_or(AppError::ResourceNotFound(Resource::Contact))
    }

    pub async fn delete_contact(&self, id: Uuid) -> Result<(), AppError> {
        if !self.crm_repo.delete_contact(id).await? {
            return Err(AppError::ResourceNotFound(Resource::Contact));
        }
        Ok(())
    }

    // =========================================================================
    //  DEALS
    // =========================================================================

    pub async fn list_deals(&self, filter: &DealFilter) -> Result<Vec<Deal>, AppError> {
        self.crm_repo.list_deals(filter).await
    }

    pub async fn get_deal(&self, id: Uuid) -> Result<Deal, AppError> {
        self.crm_repo
            .find_deal(id)
            .await?
            .ok_or(AppError::ResourceNotFound(Resource::Deal))
    }

    pub async fn create_deal(&self, actor_id: Uuid, input: &CreateDealPayload) -> Result<Deal, AppError> {
        if !self
            .crm_repo
            .customer_exists(self.crm_repo.pool(), input.customer_id)
            .await?
        {
            return Err(AppError::ResourceNotFound(Resource::Customer));
        }
        self.ensure_user(input.assigned_to).await?;
        self.crm_repo.create_deal(input, actor_id).await
    }

    pub async fn update_deal(&self, id: Uuid, input: &UpdateDealPayload) -> Result<Deal, AppError> {
        self.ensure_user(input.assigned_to).await?;
        self.crm_repo
            .update_deal(id, input)
            .await?
            .ok_or(AppError::ResourceNotFound(Resource::Deal))
    }

    /// Managers delete any deal, others only the ones assigned to them.
    pub async fn delete_deal(&self, id: Uuid, actor_id: Uuid, is_manager: bool) -> Result<(), AppError> {
        let deal = self.get_deal(id).await?;
        if !is_manager && deal.assigned_to != Some(actor_id) {
            return Err(AppError::Forbidden);
        }
        self.crm_repo.delete_deal(id).await?;
        Ok(())
    }
}
