//! Property-based tests for configuration module
//!
//! These tests use proptest to generate random configurations and verify
//! invariants, serialization round-trips, and edge case handling.

use super::*;
use proptest::prelude::*;

// Strategy for generating valid seat configurations
prop_compose! {
    fn valid_seat_config()(
        name in "[a-z][a-z0-9-]{0,15}",
        version in 1u32..=SEAT_MAX_VERSION,
        pointer in any::<bool>(),
        keyboard in any::<bool>(),
        touch in any::<bool>(),
    ) -> SeatConfig {
        SeatConfig {
            name,
            version,
            pointer,
            keyboard,
            touch,
        }
    }
}

// Strategy for generating valid logging configurations
prop_compose! {
    fn valid_logging_config()(
        level in prop_oneof![
            Just("error".to_string()),
            Just("warn".to_string()),
            Just("info".to_string()),
            Just("debug".to_string()),
            Just("trace".to_string()),
        ],
        timestamps in prop_oneof![
            Just("none".to_string()),
            Just("seconds".to_string()),
            Just("millis".to_string()),
        ],
        module_path in any::<bool>(),
        tracing in any::<bool>(),
    ) -> LoggingConfig {
        LoggingConfig {
            level,
            timestamps,
            module_path,
            tracing,
        }
    }
}

// Strategy for generating complete valid configurations
prop_compose! {
    fn valid_config()(
        seat in valid_seat_config(),
        compositor_version in 1u32..=COMPOSITOR_MAX_VERSION,
        max_resources_per_client in 1usize..100_000,
        event_queue_capacity in 1usize..4096,
        logging in valid_logging_config(),
    ) -> TetherConfig {
        TetherConfig {
            seat,
            compositor: CompositorConfig {
                compositor_version,
                subcompositor_version: SUBCOMPOSITOR_MAX_VERSION,
            },
            window_management: WindowManagementConfig::default(),
            registry: RegistryConfig { max_resources_per_client },
            session: SessionConfig { event_queue_capacity },
            logging,
        }
    }
}

proptest! {
    #[test]
    fn test_valid_configs_validate(config in valid_config()) {
        prop_assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_roundtrip_preserves_config(config in valid_config()) {
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: TetherConfig = toml::from_str(&serialized).unwrap();
        prop_assert_eq!(parsed, config);
    }

    #[test]
    fn test_out_of_range_seat_version_is_rejected(
        config in valid_config(),
        version in (SEAT_MAX_VERSION + 1)..1000u32,
    ) {
        let mut config = config;
        config.seat.version = version;
        prop_assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_timestamp_precision_is_rejected(
        config in valid_config(),
        precision in "[a-z]{1,10}",
    ) {
        prop_assume!(!["none", "seconds", "millis"].contains(&precision.as_str()));
        let mut config = config;
        config.logging.timestamps = precision;
        prop_assert!(config.validate().is_err());
    }
}
