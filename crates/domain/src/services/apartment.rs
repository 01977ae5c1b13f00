//! Apartment creation and membership queries.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::DomainError;
use crate::models::{
    Apartment, ApartmentUpdate, CreateApartmentRequest, NewApartment, UpdateApartmentRequest, User,
};
use crate::ports::{ApartmentRepository, MembershipRepository};

#[derive(Clone)]
pub struct ApartmentService {
    apartments: Arc<dyn ApartmentRepository>,
    memberships: Arc<dyn MembershipRepository>,
}

impl ApartmentService {
    pub fn new(
        apartments: Arc<dyn ApartmentRepository>,
        memberships: Arc<dyn MembershipRepository>,
    ) -> Self {
        Self {
            apartments,
            memberships,
        }
    }

    /// Creates an apartment managed by `user_id`.
    pub async fn create_apartment(
        &self,
        user_id: i64,
        request: CreateApartmentRequest,
    ) -> Result<Apartment, DomainError> {
        let apartment = self
            .apartments
            .create(NewApartment {
                apartment_name: request.apartment_name.trim().to_string(),
                address: request.address.trim().to_string(),
                units_count: request.units_count,
                manager_id: user_id,
            })
            .await
            .map_err(|e| DomainError::repository("creating apartment", e))?;

        info!(user_id = user_id, apartment_id = apartment.id, "Apartment created");
        Ok(apartment)
    }

    async fn ensure_manager(
        &self,
        user_id: i64,
        apartment_id: i64,
        action: &'static str,
    ) -> Result<(), DomainError> {
        let is_manager = self
            .memberships
            .is_manager(user_id, apartment_id)
            .await
            .map_err(|e| DomainError::repository("verifying manager status", e))?;
        if !is_manager {
            warn!(user_id = user_id, apartment_id = apartment_id, action = action, "Non-manager rejected");
            return Err(DomainError::NotAuthorized);
        }
        Ok(())
    }

    /// An apartment the caller manages.
    pub async fn apartment(&self, manager_id: i64, apartment_id: i64) -> Result<Apartment, DomainError> {
        self.ensure_manager(manager_id, apartment_id, "view apartment").await?;
        self.apartments
            .find_by_id(apartment_id)
            .await
            .map_err(|e| DomainError::repository("loading apartment", e))?
            .ok_or_else(|| DomainError::NotFound("Apartment".to_string()))
    }

    pub async fn update_apartment(
        &self,
        manager_id: i64,
        apartment_id: i64,
        request: UpdateApartmentRequest,
    ) -> Result<Apartment, DomainError> {
        self.ensure_manager(manager_id, apartment_id, "update apartment").await?;
        let apartment = self
            .apartments
            .update(
                apartment_id,
                ApartmentUpdate {
                    apartment_name: request.apartment_name.trim().to_string(),
                    address: request.address.trim().to_string(),
                    units_count: request.units_count,
                },
            )
            .await
            .map_err(|e| DomainError::repository("updating apartment", e))?
            .ok_or_else(|| DomainError::NotFound("Apartment".to_string()))?;

        info!(user_id = manager_id, apartment_id = apartment_id, "Apartment updated");
        Ok(apartment)
    }

    /// Deletes an apartment with its memberships, bills and payments.
    pub async fn delete_apartment(&self, manager_id: i64, apartment_id: i64) -> Result<(), DomainError> {
        self.ensure_manager(manager_id, apartment_id, "delete apartment").await?;
        let deleted = self
            .apartments
            .delete(apartment_id)
            .await
            .map_err(|e| DomainError::repository("deleting apartment", e))?;
        if !deleted {
            return Err(DomainError::NotFound("Apartment".to_string()));
        }

        info!(user_id = manager_id, apartment_id = apartment_id, "Apartment deleted");
        Ok(())
    }

    /// Members of an apartment. Manager only.
    pub async fn residents(&self, manager_id: i64, apartment_id: i64) -> Result<Vec<User>, DomainError> {
        self.ensure_manager(manager_id, apartment_id, "list residents").await?;

        self.memberships
            .residents_of(apartment_id)
            .await
            .map_err(|e| DomainError::repository("loading residents", e))
    }

    pub async fn apartments_for_resident(&self, user_id: i64) -> Result<Vec<Apartment>, DomainError> {
        self.apartments
            .list_for_member(user_id)
            .await
            .map_err(|e| DomainError::repository("listing apartments", e))
    }

    pub async fn leave_apartment(&self, user_id: i64, apartment_id: i64) -> Result<(), DomainError> {
        let removed = self
            .memberships
            .delete_membership(user_id, apartment_id)
            .await
            .map_err(|e| DomainError::repository("leaving apartment", e))?;
        if !removed {
            return Err(DomainError::NotFound("Membership".to_string()));
        }

        info!(user_id = user_id, apartment_id = apartment_id, "User left apartment");
        Ok(())
    }
}
