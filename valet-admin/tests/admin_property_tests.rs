//! Property-Based Tests for Admin Access Enforcement
//!
//! **Property 5: Admin Gate**
//! For any submitted form, a caller who is not an administrator is refused
//! and no tier changes; an administrator's form is applied.

use proptest::prelude::*;
use valet_admin::{AdminError, AdminErrorCode, AdminRequest, AdminService, Principal};
use valet_core::ValetConfig;
use valet_test_utils::fixtures::TestTiers;
use valet_test_utils::generators::*;

fn arb_non_admin() -> impl Strategy<Value = Principal> {
    prop_oneof![
        Just(Principal::Anonymous),
        "[a-z]{1,10}@example\\.com".prop_map(Principal::user),
    ]
}

fn arb_request() -> impl Strategy<Value = AdminRequest> {
    prop_oneof![
        (arb_key(), arb_value()).prop_map(|(k, v)| AdminRequest::add(k, v)),
        arb_key().prop_map(AdminRequest::delete),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime should build")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_non_admin_never_mutates(
        principal in arb_non_admin(),
        seeded in arb_entries(6),
        request in arb_request(),
    ) {
        let rt = runtime();
        rt.block_on(async {
            let tiers = TestTiers::seeded(seeded.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            let service = AdminService::from_config(tiers.process(), &ValetConfig::default());

            let err: AdminError = match service.apply(&principal, &request).await {
                Ok(()) => return Err(TestCaseError::fail("non-admin request was applied")),
                Err(e) => e.into(),
            };

            let expected = match principal {
                Principal::Anonymous => AdminErrorCode::Unauthenticated,
                Principal::User { .. } => AdminErrorCode::Forbidden,
            };
            prop_assert_eq!(err.code, expected);
            prop_assert_eq!(tiers.store.len(), seeded.len());
            for (key, value) in &seeded {
                prop_assert_eq!(tiers.store.peek(key), Some(value.clone()));
            }
            Ok(())
        })?;
    }

    #[test]
    fn prop_admin_add_then_list(entries in arb_entries(8)) {
        let rt = runtime();
        rt.block_on(async {
            let tiers = TestTiers::new();
            let service = AdminService::from_config(tiers.process(), &ValetConfig::default());
            let admin = Principal::admin("admin@example.com");

            for (key, value) in &entries {
                prop_assert!(service.apply(&admin, &AdminRequest::add(key.clone(), value.clone())).await.is_ok());
            }
            let listing = service.list_all(&admin).await.expect("list");
            prop_assert_eq!(&listing, &entries);

            if let Some(key) = entries.keys().next() {
                prop_assert!(service.apply(&admin, &AdminRequest::delete(key.clone())).await.is_ok());
                let listing = service.list_all(&admin).await.expect("list");
                prop_assert!(!listing.contains_key(key));
            }
            Ok(())
        })?;
    }
}
