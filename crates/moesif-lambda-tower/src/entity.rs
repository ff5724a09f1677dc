//! User and company profile updates.
//!
//! Payloads are validated before any remote call. Once validated they are
//! forwarded unchanged and the collector's outcome is returned as-is.

use crate::error::{EntityError, ValidationError};
use moesif_api::{CompanyModel, MoesifApi, UserModel};

pub(crate) async fn update_user(api: &dyn MoesifApi, user: &UserModel) -> Result<(), EntityError> {
    validate_user(user)?;
    api.update_user(user).await?;
    Ok(())
}

pub(crate) async fn update_users_batch(
    api: &dyn MoesifApi,
    users: &[UserModel],
) -> Result<(), EntityError> {
    if let Some(index) = users.iter().position(|user| user.user_id.is_empty()) {
        return Err(ValidationError::MissingUserIdInBatch { index }.into());
    }
    api.update_users_batch(users).await?;
    Ok(())
}

pub(crate) async fn update_company(
    api: &dyn MoesifApi,
    company: &CompanyModel,
) -> Result<(), EntityError> {
    validate_company(company)?;
    api.update_company(company).await?;
    Ok(())
}

pub(crate) async fn update_companies_batch(
    api: &dyn MoesifApi,
    companies: &[CompanyModel],
) -> Result<(), EntityError> {
    if let Some(index) = companies
        .iter()
        .position(|company| company.company_id.is_empty())
    {
        return Err(ValidationError::MissingCompanyIdInBatch { index }.into());
    }
    api.update_companies_batch(companies).await?;
    Ok(())
}

fn validate_user(user: &UserModel) -> Result<(), ValidationError> {
    if user.user_id.is_empty() {
        return Err(ValidationError::MissingUserId);
    }
    Ok(())
}

fn validate_company(company: &CompanyModel) -> Result<(), ValidationError> {
    if company.company_id.is_empty() {
        return Err(ValidationError::MissingCompanyId);
    }
    Ok(())
}
