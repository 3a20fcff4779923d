//! Seed the database with a demo catalog.
//!
//! Reads sellers, their stores and products from a YAML file and creates them
//! through the same services the API uses, so every record passes the normal
//! validation. Sellers whose email already exists are skipped, which makes
//! the command safe to re-run.

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info, warn};

use souq_api::config::ApiConfig;
use souq_api::db::{DocumentStore, PgDocumentStore};
use souq_api::middleware::CurrentUser;
use souq_api::services::{AuthError, AuthService, ProductService, StoreService};
use souq_api::state::AppState;
use souq_core::forms::account::Registration;
use souq_core::forms::product::{NewProduct, ProductForm};
use souq_core::forms::store::{NewStore, StoreForm};
use souq_core::{Email, StoreStatus, UserRole};

use super::connect;

/// One seller entry of the catalog file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedSeller {
    pub email: String,
    pub password: String,
    pub name: String,
    pub store: StoreForm,
    #[serde(default)]
    pub products: Vec<ProductForm>,
}

/// Catalog file layout.
#[derive(Debug, Deserialize)]
pub struct Catalog {
    pub sellers: Vec<SeedSeller>,
}

/// A seller whose every form validated.
#[derive(Debug)]
pub struct ValidSeller {
    pub email: Email,
    pub password: String,
    pub name: String,
    pub store: NewStore,
    pub products: Vec<NewProduct>,
}

/// Validate every entry, collecting one message per failure.
pub fn validate_catalog(catalog: Catalog) -> Result<Vec<ValidSeller>, Vec<String>> {
    let mut valid = Vec::new();
    let mut errors = Vec::new();

    for seller in catalog.sellers {
        let email = match Email::parse(&seller.email) {
            Ok(email) => email,
            Err(e) => {
                errors.push(format!("{}: {e}", seller.email));
                continue;
            }
        };
        let store = match seller.store.validate() {
            Ok(store) => store,
            Err(e) => {
                errors.push(format!("{email} store: {e}"));
                continue;
            }
        };
        let mut products = Vec::new();
        for (index, form) in seller.products.into_iter().enumerate() {
            match form.validate() {
                Ok(product) => products.push(product),
                Err(e) => errors.push(format!("{email} product #{}: {e}", index + 1)),
            }
        }
        valid.push(ValidSeller {
            email,
            password: seller.password,
            name: seller.name,
            store,
            products,
        });
    }

    if errors.is_empty() { Ok(valid) } else { Err(errors) }
}

/// Seed the catalog in `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation, or if a
/// database operation fails.
pub async fn catalog(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let catalog: Catalog = serde_yaml::from_str(&content)?;

    let sellers = match validate_catalog(catalog) {
        Ok(sellers) => sellers,
        Err(errors) => {
            error!("Catalog validation failed:");
            for err in &errors {
                error!("  - {err}");
            }
            return Err(format!("{} validation errors found", errors.len()).into());
        }
    };
    info!(sellers = sellers.len(), "Catalog validated successfully");

    let pool = connect().await?;
    let documents: std::sync::Arc<dyn DocumentStore> = std::sync::Arc::new(PgDocumentStore::new(pool));
    let state = AppState::new(ApiConfig::from_env()?, documents);

    let mut stores = 0_usize;
    let mut products = 0_usize;
    let mut skipped = 0_usize;

    for seller in sellers {
        let registration = Registration {
            email: seller.email.clone(),
            password: seller.password,
            name: seller.name,
            phone: None,
            role: UserRole::Customer,
            preferred_locale: None,
        };
        let user = match AuthService::new(state.documents()).register(registration).await {
            Ok(user) => user,
            Err(AuthError::EmailTaken) => {
                warn!(email = %seller.email, "Seller already exists, skipping");
                skipped += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let mut owner = CurrentUser::from(&user);
        let service = StoreService::new(&state);
        let (store, role) = service.create(&owner, seller.store).await?;
        service.set_status(&store.id, StoreStatus::Active).await?;
        owner.role = role;
        stores += 1;

        let catalog = ProductService::new(&state);
        for product in seller.products {
            catalog.create(&owner, product).await?;
            products += 1;
        }
        info!(store = %store.slug, "Seeded store");
    }

    info!("Seeding complete!");
    info!("  Stores created: {stores}");
    info!("  Products created: {products}");
    info!("  Sellers skipped (already exist): {skipped}");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
sellers:
  - email: Dates@Example.com
    password: "tamr-2026!"
    name: Huda
    store:
      name: { ar: "تمور المدينة", en: "Madinah Dates" }
      slug: madinah-dates
      shippingFee: 15.0
    products:
      - name: { ar: "عجوة", en: "Ajwa" }
        category: food
        price: 89.5
        stock: 40
        status: active
"#;

    #[test]
    fn test_valid_catalog() {
        let catalog: Catalog = serde_yaml::from_str(CATALOG).unwrap();
        let sellers = validate_catalog(catalog).unwrap();
        assert_eq!(sellers.len(), 1);
        assert_eq!(sellers[0].email.as_str(), "dates@example.com");
        assert_eq!(sellers[0].store.slug, "madinah-dates");
        assert_eq!(sellers[0].products.len(), 1);
        assert_eq!(sellers[0].products[0].stock, 40);
    }

    #[test]
    fn test_invalid_entries_are_reported() {
        let yaml = r"
sellers:
  - email: not-an-email
    password: x
    name: A
    store: { name: { ar: a }, slug: abc }
  - email: b@example.com
    password: x
    name: B
    store: { name: { ar: b }, slug: '!!' }
";
        let catalog: Catalog = serde_yaml::from_str(yaml).unwrap();
        let errors = validate_catalog(catalog).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("not-an-email"));
        assert!(errors[1].contains("store"));
    }
}
