//! Customer registry: find or create the remote customer for a donor

use crate::error::{DonationError, DonationResult};
use crate::hooks::GatewayHooks;
use crate::request::{DonationRequest, DonorIdentity};
use crate::store::{CustomerMappingStore, MappingWrite};
use give_bongloy_config::Environment;
use give_bongloy_payments::{CardGateway, CreateCustomerRequest, CustomerId};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct CustomerRegistry {
    cards: Arc<dyn CardGateway>,
    mappings: Arc<dyn CustomerMappingStore>,
    hooks: Arc<dyn GatewayHooks>,
}

impl CustomerRegistry {
    pub fn new(
        cards: Arc<dyn CardGateway>,
        mappings: Arc<dyn CustomerMappingStore>,
        hooks: Arc<dyn GatewayHooks>,
    ) -> Self {
        Self {
            cards,
            mappings,
            hooks,
        }
    }

    /// Reuse the donor's live remote customer, or create one and persist the
    /// mapping before returning.
    ///
    /// Lookup misses, stale mappings and lookup errors all fall through to
    /// creation. Only a failed creation is an error.
    pub async fn get_or_create(
        &self,
        env: Environment,
        request: &DonationRequest,
    ) -> DonationResult<CustomerId> {
        let identities = request.donor.identities();

        let mut stale = None;
        for identity in &identities {
            let mapped = match self.mappings.get_customer_mapping(identity, env).await {
                Ok(Some(id)) => id,
                Ok(None) => continue,
                Err(e) => {
                    warn!(%identity, error = %e, "customer mapping lookup failed");
                    continue;
                }
            };

            match self.cards.retrieve_customer(env, &mapped).await {
                Ok(customer) if !customer.deleted => {
                    debug!(%identity, customer = %mapped, "reusing remote customer");
                    self.refresh(&identities, env, &mapped).await;
                    return Ok(mapped);
                }
                Ok(_) => {
                    info!(%identity, customer = %mapped, "mapped customer was deleted remotely");
                }
                Err(e) => {
                    warn!(%identity, customer = %mapped, error = %e, "customer lookup failed");
                }
            }
            stale.get_or_insert((identity.clone(), mapped));
        }

        let created = self
            .cards
            .create_customer(env, &self.customer_request(request))
            .await
            .map_err(DonationError::CustomerCreationFailed)?;
        info!(customer = %created.id, env = %env, "created remote customer");

        self.persist(&identities, env, stale, created.id).await
    }

    fn customer_request(&self, request: &DonationRequest) -> CreateCustomerRequest {
        let donor = &request.donor;
        let email = donor.email.trim();

        let mut metadata = BTreeMap::new();
        metadata.insert("first_name".to_string(), donor.first_name.clone());
        metadata.insert("last_name".to_string(), donor.last_name.clone());
        metadata.insert("created_by".to_string(), request.form.title().to_string());

        if let Some(address) = donor.address.as_ref().filter(|a| !a.is_empty()) {
            let fields = [
                ("address_line1", &address.line1),
                ("address_line2", &address.line2),
                ("address_city", &address.city),
                ("address_state", &address.state),
                ("address_country", &address.country),
                ("address_zip", &address.zip),
            ];
            for (key, value) in fields {
                metadata.insert(key.to_string(), value.clone().unwrap_or_default());
            }
        }

        self.hooks.customer_metadata(&mut metadata, request);

        CreateCustomerRequest {
            description: Some(format!("Customer for {}", email)),
            email: Some(email.to_string()),
            metadata,
        }
    }

    /// Write the new id for every identity. The primary identity goes
    /// through compare-and-set; if another request stored a customer first,
    /// theirs wins.
    async fn persist(
        &self,
        identities: &[DonorIdentity],
        env: Environment,
        stale: Option<(DonorIdentity, CustomerId)>,
        created: CustomerId,
    ) -> DonationResult<CustomerId> {
        let Some(primary) = identities.first() else {
            return Ok(created);
        };

        let expected = stale
            .as_ref()
            .filter(|(identity, _)| identity == primary)
            .map(|(_, id)| id);

        let winner = match self
            .mappings
            .compare_and_set(primary, env, expected, &created)
            .await?
        {
            MappingWrite::Stored => created,
            MappingWrite::Conflict(Some(current)) => {
                warn!(
                    identity = %primary,
                    ours = %created,
                    theirs = %current,
                    "customer mapping raced, keeping the stored customer"
                );
                current
            }
            MappingWrite::Conflict(None) => {
                self.mappings
                    .set_customer_mapping(primary, env, &created)
                    .await?;
                created
            }
        };

        for identity in &identities[1..] {
            self.mappings
                .set_customer_mapping(identity, env, &winner)
                .await?;
        }
        Ok(winner)
    }

    async fn refresh(&self, identities: &[DonorIdentity], env: Environment, id: &CustomerId) {
        for identity in identities {
            if let Err(e) = self.mappings.set_customer_mapping(identity, env, id).await {
                warn!(%identity, error = %e, "could not refresh customer mapping");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::NoHooks;
    use crate::request::{DonorProfile, FormInfo, PaymentInput};
    use crate::error::StoreError;
    use crate::store::InMemoryStore;
    use crate::testing::MockCardGateway;
    use async_trait::async_trait;
    use give_bongloy_payments::{Address, Currency};
    use rust_decimal_macros::dec;

    fn request(donor: DonorProfile) -> DonationRequest {
        DonationRequest::new(
            dec!(10),
            Currency::from_code("USD").unwrap(),
            donor,
            PaymentInput::Absent,
        )
        .with_form(FormInfo::new(4, "Winter Appeal"))
    }

    fn registry(cards: Arc<MockCardGateway>, store: Arc<InMemoryStore>) -> CustomerRegistry {
        CustomerRegistry::new(cards, store, Arc::new(NoHooks))
    }

    fn email() -> DonorIdentity {
        DonorIdentity::Email("donor@example.org".into())
    }

    #[tokio::test]
    async fn test_existing_mapping_never_creates() {
        let cards = Arc::new(MockCardGateway::new().with_customer("cus_existing", false));
        let store = Arc::new(InMemoryStore::new());
        let existing = CustomerId::new("cus_existing").unwrap();
        store
            .set_customer_mapping(&email(), Environment::Test, &existing)
            .await
            .unwrap();

        let id = registry(cards.clone(), store)
            .get_or_create(Environment::Test, &request(DonorProfile::new("donor@example.org")))
            .await
            .unwrap();

        assert_eq!(id, existing);
        assert!(!cards.was_called("create_customer"));
    }

    #[tokio::test]
    async fn test_deleted_customer_is_recreated() {
        let cards = Arc::new(MockCardGateway::new().with_customer("cus_gone", true));
        let store = Arc::new(InMemoryStore::new());
        store
            .set_customer_mapping(&email(), Environment::Test, &CustomerId::new("cus_gone").unwrap())
            .await
            .unwrap();

        let id = registry(cards.clone(), store.clone())
            .get_or_create(Environment::Test, &request(DonorProfile::new("donor@example.org")))
            .await
            .unwrap();

        assert_ne!(id.as_str(), "cus_gone");
        assert_eq!(cards.method_call_count("create_customer"), 1);
        assert_eq!(
            store.get_customer_mapping(&email(), Environment::Test).await.unwrap(),
            Some(id)
        );
    }

    #[tokio::test]
    async fn test_lookup_error_falls_through_to_creation() {
        let cards = Arc::new(
            MockCardGateway::new().fail_on("retrieve_customer", "temporarily unavailable"),
        );
        let store = Arc::new(InMemoryStore::new());
        store
            .set_customer_mapping(&email(), Environment::Test, &CustomerId::new("cus_1").unwrap())
            .await
            .unwrap();

        let result = registry(cards.clone(), store)
            .get_or_create(Environment::Test, &request(DonorProfile::new("donor@example.org")))
            .await;

        assert!(result.is_ok());
        assert!(cards.was_called("create_customer"));
    }

    #[tokio::test]
    async fn test_creation_failure() {
        let cards = Arc::new(MockCardGateway::new().fail_on("create_customer", "invalid email"));
        let store = Arc::new(InMemoryStore::new());

        let err = registry(cards, store.clone())
            .get_or_create(Environment::Test, &request(DonorProfile::new("donor@example.org")))
            .await
            .unwrap_err();

        assert!(matches!(err, DonationError::CustomerCreationFailed(_)));
        assert_eq!(
            store.get_customer_mapping(&email(), Environment::Test).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_creation_payload_and_user_mapping() {
        let cards = Arc::new(MockCardGateway::new());
        let store = Arc::new(InMemoryStore::new());
        let donor = DonorProfile::new("donor@example.org")
            .with_name("Jane", "Donor")
            .with_user_id(42)
            .with_address(Address {
                city: Some("Phnom Penh".into()),
                country: Some("KH".into()),
                ..Default::default()
            });

        let id = registry(cards.clone(), store.clone())
            .get_or_create(Environment::Live, &request(donor))
            .await
            .unwrap();

        let customer = cards.customer(id.as_str()).unwrap();
        assert_eq!(customer.description.as_deref(), Some("Customer for donor@example.org"));
        assert_eq!(customer.metadata["created_by"], "Winter Appeal");
        assert_eq!(customer.metadata["address_city"], "Phnom Penh");
        assert_eq!(customer.metadata["address_line1"], "");

        assert_eq!(
            store
                .get_customer_mapping(&DonorIdentity::UserId(42), Environment::Live)
                .await
                .unwrap(),
            Some(id)
        );
        assert_eq!(
            store.get_customer_mapping(&email(), Environment::Test).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_user_id_mapping_used_when_email_unmapped() {
        let cards = Arc::new(MockCardGateway::new().with_customer("cus_user", false));
        let store = Arc::new(InMemoryStore::new());
        store
            .set_customer_mapping(
                &DonorIdentity::UserId(9),
                Environment::Test,
                &CustomerId::new("cus_user").unwrap(),
            )
            .await
            .unwrap();

        let donor = DonorProfile::new("donor@example.org").with_user_id(9);
        let id = registry(cards.clone(), store.clone())
            .get_or_create(Environment::Test, &request(donor))
            .await
            .unwrap();

        assert_eq!(id.as_str(), "cus_user");
        assert!(!cards.was_called("create_customer"));
        assert_eq!(
            store.get_customer_mapping(&email(), Environment::Test).await.unwrap(),
            Some(id)
        );
    }

    /// Reads miss while another request has already written the mapping
    struct LateWriter(Arc<InMemoryStore>);

    #[async_trait]
    impl CustomerMappingStore for LateWriter {
        async fn get_customer_mapping(
            &self,
            _identity: &DonorIdentity,
            _env: Environment,
        ) -> Result<Option<CustomerId>, StoreError> {
            Ok(None)
        }

        async fn set_customer_mapping(
            &self,
            identity: &DonorIdentity,
            env: Environment,
            customer: &CustomerId,
        ) -> Result<(), StoreError> {
            self.0.set_customer_mapping(identity, env, customer).await
        }

        async fn compare_and_set(
            &self,
            identity: &DonorIdentity,
            env: Environment,
            expected: Option<&CustomerId>,
            customer: &CustomerId,
        ) -> Result<MappingWrite, StoreError> {
            self.0.compare_and_set(identity, env, expected, customer).await
        }
    }

    #[tokio::test]
    async fn test_losing_a_mapping_race_keeps_the_stored_customer() {
        let cards = Arc::new(MockCardGateway::new());
        let store = Arc::new(InMemoryStore::new());
        let winner = CustomerId::new("cus_winner").unwrap();
        store
            .set_customer_mapping(&email(), Environment::Test, &winner)
            .await
            .unwrap();

        let registry = CustomerRegistry::new(
            cards.clone(),
            Arc::new(LateWriter(store.clone())),
            Arc::new(NoHooks),
        );
        let donor = DonorProfile::new("donor@example.org").with_user_id(7);
        let id = registry
            .get_or_create(Environment::Test, &request(donor))
            .await
            .unwrap();

        assert_eq!(id, winner);
        assert_eq!(cards.method_call_count("create_customer"), 1);
        assert_eq!(
            store.get_customer_mapping(&email(), Environment::Test).await.unwrap(),
            Some(winner.clone())
        );
        assert_eq!(
            store
                .get_customer_mapping(&DonorIdentity::UserId(7), Environment::Test)
                .await
                .unwrap(),
            Some(winner)
        );
    }
}
