//! Supabase PostgREST record store.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use sentient_core::{
    NewPayment, NewProfile, PaymentId, PaymentRecord, PaymentUpdate, PaymentWithOwner, UserId,
    UserProfile,
};

use crate::error::{PostgrestErrorBody, Result, StoreError};
use crate::schema::{rpc, table, PAYMENT_WITH_OWNER_SELECT};
use crate::{Caller, RecordStore};

/// Request timeout for PostgREST calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Record store backed by a Supabase project's REST endpoint.
#[derive(Debug, Clone)]
pub struct SupabaseRecordStore {
    client: Client,
    rest_url: String,
    anon_key: String,
}

impl SupabaseRecordStore {
    /// Create a store for the project at `project_url` (e.g. `https://xyz.supabase.co`).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(project_url: &str, anon_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StoreError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            rest_url: format!("{}/rest/v1", project_url.trim_end_matches('/')),
            anon_key: anon_key.into(),
        })
    }

    fn table_url(&self, name: &str) -> String {
        format!("{}/{name}", self.rest_url)
    }

    /// Attach the project key and the caller's token so row policies apply.
    fn authorize(&self, request: RequestBuilder, caller: &Caller) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(&caller.access_token)
    }

    /// Handle a PostgREST response and classify errors.
    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let text = response.text().await.unwrap_or_default();
        let body: PostgrestErrorBody = serde_json::from_str(&text).unwrap_or_else(|_| PostgrestErrorBody {
            message: Some(text.clone()),
            ..PostgrestErrorBody::default()
        });

        let err = StoreError::from_postgrest(status.as_u16(), body);
        tracing::warn!(status = %status, error = %err, "PostgREST request failed");
        Err(err)
    }

    /// Insert a row and return the stored representation.
    async fn insert_returning<B, T>(&self, caller: &Caller, name: &str, body: &B) -> Result<T>
    where
        B: serde::Serialize + Sync,
        T: DeserializeOwned,
    {
        let request = self
            .client
            .post(self.table_url(name))
            .header("Prefer", "return=representation")
            .json(body);

        let response = self.authorize(request, caller).send().await?;
        let mut rows: Vec<T> = Self::handle_response(response).await?;

        if rows.is_empty() {
            return Err(StoreError::Backend {
                status: 200,
                code: None,
                message: format!("insert into {name} returned no row"),
            });
        }
        Ok(rows.swap_remove(0))
    }
}

#[async_trait]
impl RecordStore for SupabaseRecordStore {
    async fn get_profile(&self, caller: &Caller, user_id: &UserId) -> Result<Option<UserProfile>> {
        let request = self
            .client
            .get(self.table_url(table::PROFILES))
            .query(&[
                ("select", "*".to_string()),
                ("id", format!("eq.{user_id}")),
                ("limit", "1".to_string()),
            ]);

        let response = self.authorize(request, caller).send().await?;
        let rows: Vec<UserProfile> = Self::handle_response(response).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_profile(&self, caller: &Caller, profile: &NewProfile) -> Result<UserProfile> {
        let row: UserProfile = self.insert_returning(caller, table::PROFILES, profile).await?;
        tracing::debug!(user_id = %row.id, "Profile row created");
        Ok(row)
    }

    async fn insert_payment(&self, caller: &Caller, payment: &NewPayment) -> Result<PaymentRecord> {
        let row: PaymentRecord = self.insert_returning(caller, table::PAYMENTS, payment).await?;
        tracing::debug!(payment_id = %row.id, method = %row.payment_method, "Payment row created");
        Ok(row)
    }

    async fn update_payment(
        &self,
        caller: &Caller,
        payment_id: &PaymentId,
        update: &PaymentUpdate,
    ) -> Result<PaymentRecord> {
        let request = self
            .client
            .patch(self.table_url(table::PAYMENTS))
            .query(&[("id", format!("eq.{payment_id}"))])
            .header("Prefer", "return=representation")
            .json(update);

        let response = self.authorize(request, caller).send().await?;
        let rows: Vec<PaymentRecord> = Self::handle_response(response).await?;

        // an update hidden by row policies also comes back empty
        rows.into_iter().next().ok_or_else(|| StoreError::NotFound {
            entity: "payment",
            id: payment_id.to_string(),
        })
    }

    async fn list_payments_for_user(
        &self,
        caller: &Caller,
        user_id: &UserId,
    ) -> Result<Vec<PaymentRecord>> {
        let request = self
            .client
            .get(self.table_url(table::PAYMENTS))
            .query(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{user_id}")),
                ("order", "created_at.desc".to_string()),
            ]);

        let response = self.authorize(request, caller).send().await?;
        Self::handle_response(response).await
    }

    async fn list_payments_with_owners(&self, caller: &Caller) -> Result<Vec<PaymentWithOwner>> {
        let request = self
            .client
            .get(self.table_url(table::PAYMENTS))
            .query(&[
                ("select", PAYMENT_WITH_OWNER_SELECT),
                ("order", "created_at.desc"),
            ]);

        let response = self.authorize(request, caller).send().await?;
        Self::handle_response(response).await
    }

    async fn get_payment_with_owner(
        &self,
        caller: &Caller,
        payment_id: &PaymentId,
    ) -> Result<Option<PaymentWithOwner>> {
        let request = self
            .client
            .get(self.table_url(table::PAYMENTS))
            .query(&[
                ("select", PAYMENT_WITH_OWNER_SELECT.to_string()),
                ("id", format!("eq.{payment_id}")),
                ("limit", "1".to_string()),
            ]);

        let response = self.authorize(request, caller).send().await?;
        let rows: Vec<PaymentWithOwner> = Self::handle_response(response).await?;
        Ok(rows.into_iter().next())
    }

    async fn is_admin(&self, caller: &Caller, user_id: &UserId) -> Result<bool> {
        let request = self
            .client
            .post(format!("{}/rpc/{}", self.rest_url, rpc::CHECK_ADMIN_STATUS))
            .json(&serde_json::json!({ "user_id": user_id }));

        let response = self.authorize(request, caller).send().await?;
        Self::handle_response(response).await
    }
}
