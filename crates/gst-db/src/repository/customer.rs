//! # Customer Repository
//!
//! Buyers and their billing / shipping states. The shipping state, when
//! present, decides the place of supply.

use chrono::Utc;
use gst_core::Customer;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use super::new_id;
use crate::error::DbResult;

/// Repository for customer rows.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Creates a customer for an issuer.
    pub async fn create(
        &self,
        company_id: &str,
        name: &str,
        billing_state: Option<&str>,
        shipping_state: Option<&str>,
    ) -> DbResult<Customer> {
        let now = Utc::now();
        let customer = Customer {
            id: new_id(),
            company_id: company_id.to_string(),
            name: name.to_string(),
            billing_state: billing_state.map(String::from),
            shipping_state: shipping_state.map(String::from),
            gstin: None,
            created_at: now,
            updated_at: now,
        };

        self.insert(&customer).await?;
        Ok(customer)
    }

    /// Inserts a fully specified customer.
    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        debug!(id = %customer.id, company_id = %customer.company_id, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, company_id, name, billing_state, shipping_state, gstin,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.company_id)
        .bind(&customer.name)
        .bind(&customer.billing_state)
        .bind(&customer.shipping_state)
        .bind(&customer.gstin)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a customer by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let mut conn = self.pool.acquire().await?;
        Self::tx_get(&mut conn, id).await
    }

    /// Reads a customer on the caller's connection.
    pub async fn tx_get(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, company_id, name, billing_state, shipping_state, gstin,
                   created_at, updated_at
            FROM customers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(customer)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_create_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let company = db.companies().create("Acme Traders", Some("Karnataka")).await.unwrap();

        let customer = db
            .customers()
            .create(&company.id, "Blue Mart", Some("Karnataka"), Some("Kerala"))
            .await
            .unwrap();

        let loaded = db.customers().get_by_id(&customer.id).await.unwrap().unwrap();
        assert_eq!(loaded.effective_state(), Some("Kerala"));
        assert_eq!(loaded.company_id, company.id);
    }

    #[tokio::test]
    async fn test_customer_requires_existing_company() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let result = db.customers().create("missing", "Blue Mart", None, None).await;
        assert!(matches!(result, Err(crate::DbError::ForeignKeyViolation { .. })));
    }
}
