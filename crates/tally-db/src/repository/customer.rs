//! # Customer Repository
//!
//! Customers are created directly or implicitly at checkout (matched by
//! phone). Their debt, spend and loyalty counters are changed only by
//! completed sales; see the transaction repository.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::rows::CustomerRow;
use crate::error::{DbError, DbResult};
use tally_core::validation::validate_phone;
use tally_core::{CoreError, Customer, NewCustomer, ValidationError};

const CUSTOMER_COLUMNS: &str = "id, full_name, phone, email, total_spent_cents, debt_cents, \
                                loyalty_points, last_purchase_at, created_at";

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Creates a customer with zeroed counters.
    pub async fn create(&self, new: &NewCustomer) -> DbResult<Customer> {
        let mut conn = self.pool.acquire().await?;
        insert_in(&mut conn, new).await
    }

    pub async fn get(&self, id: &str) -> DbResult<Customer> {
        let mut conn = self.pool.acquire().await?;
        get_in(&mut conn, id).await
    }

    pub async fn get_by_phone(&self, phone: &str) -> DbResult<Option<Customer>> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE phone = ?1"
        ))
        .bind(phone.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Customer::from))
    }

    /// Lists customers, most recent first.
    pub async fn list(&self, limit: u32, offset: u32) -> DbResult<Vec<Customer>> {
        let rows = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY rowid DESC LIMIT ?1 OFFSET ?2"
        ))
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Customer::from).collect())
    }
}

fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub(crate) async fn get_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Customer> {
    let row = sqlx::query_as::<_, CustomerRow>(&format!(
        "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(Customer::from)
        .ok_or_else(|| CoreError::CustomerNotFound(id.to_string()).into())
}

pub(crate) async fn insert_in(conn: &mut SqliteConnection, new: &NewCustomer) -> DbResult<Customer> {
    let phone = clean(&new.phone);
    if let Some(phone) = &phone {
        validate_phone(phone)?;
    }
    let full_name = clean(&new.full_name);
    let email = clean(&new.email);
    if full_name.is_none() && phone.is_none() && email.is_none() {
        return Err(ValidationError::Required {
            field: "full_name".to_string(),
        }
        .into());
    }

    let customer = Customer {
        id: Uuid::new_v4().to_string(),
        full_name,
        phone,
        email,
        total_spent_cents: 0,
        debt_cents: 0,
        loyalty_points: 0,
        last_purchase_at: None,
        created_at: Utc::now(),
    };

    debug!(customer_id = %customer.id, phone = ?customer.phone, "Inserting customer");

    sqlx::query(
        r#"
        INSERT INTO customers (
            id, full_name, phone, email, total_spent_cents,
            debt_cents, loyalty_points, last_purchase_at, created_at
        ) VALUES (?1, ?2, ?3, ?4, 0, 0, 0, NULL, ?5)
        "#,
    )
    .bind(&customer.id)
    .bind(&customer.full_name)
    .bind(&customer.phone)
    .bind(&customer.email)
    .bind(customer.created_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { field, .. } => {
            DbError::duplicate(field, customer.phone.clone().unwrap_or_default())
        }
        other => other,
    })?;

    Ok(customer)
}

/// Returns the customer with `new.phone`, creating one if none exists.
pub(crate) async fn get_or_create_by_phone_in(
    conn: &mut SqliteConnection,
    new: &NewCustomer,
) -> DbResult<Customer> {
    if let Some(phone) = clean(&new.phone) {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE phone = ?1"
        ))
        .bind(&phone)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(row) = row {
            return Ok(row.into());
        }
    }

    let customer = insert_in(conn, new).await?;
    info!(customer_id = %customer.id, "Customer created at checkout");
    Ok(customer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn amina() -> NewCustomer {
        NewCustomer {
            full_name: Some("Amina Yusupova".to_string()),
            phone: Some("+998 90 123-45-67".to_string()),
            email: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customer = db.customers().create(&amina()).await.unwrap();

        assert_eq!(customer.debt_cents, 0);
        assert_eq!(customer.loyalty_points, 0);
        assert_eq!(db.customers().get(&customer.id).await.unwrap(), customer);
        assert_eq!(
            db.customers()
                .get_by_phone("+998 90 123-45-67")
                .await
                .unwrap()
                .map(|c| c.id),
            Some(customer.id)
        );
        assert_eq!(db.customers().list(10, 0).await.unwrap().len(), 1);

        let dup = db.customers().create(&amina()).await.unwrap_err();
        assert!(matches!(dup, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_get_or_create_reuses_phone() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        let first = get_or_create_by_phone_in(&mut conn, &amina()).await.unwrap();
        let again = get_or_create_by_phone_in(&mut conn, &amina()).await.unwrap();
        assert_eq!(first.id, again.id);
    }

    #[tokio::test]
    async fn test_rejects_bad_input() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let bad_phone = NewCustomer {
            phone: Some("call me".to_string()),
            ..amina()
        };
        assert!(matches!(
            db.customers().create(&bad_phone).await,
            Err(DbError::Domain(CoreError::Validation(_)))
        ));

        let empty = NewCustomer::default();
        assert!(db.customers().create(&empty).await.is_err());

        assert!(matches!(
            db.customers().get("missing").await,
            Err(DbError::Domain(CoreError::CustomerNotFound(_)))
        ));
    }
}
