//! 可观测性模块集成测试
//!
//! 未安装 recorder 时指标记录为空操作，这里验证各记录函数在任意输入下不会 panic。

// ============================================================================
// 指标记录测试
// ============================================================================

mod metrics_tests {
    use premiads_shared::observability::metrics::{
        record_cashback_credited, record_credit_purchase, record_crm_unlock, record_http_request,
        record_notifications_sent, record_raffle_draw, record_raffle_entries_sold,
        record_referral_completed, record_rifas_credited, record_rifas_debited,
        record_submission_moderation,
    };

    #[test]
    fn test_record_http_request() {
        record_http_request("POST", "/functions/v1/approve-submission", 200, 0.05);
        record_http_request("POST", "/functions/v1/unlock-crm", 403, 0.01);
        record_http_request("OPTIONS", "/functions/v1/raffles", 200, 0.001);
        record_http_request("GET", "/ready", 200, 0.02);
        record_http_request("POST", "/functions/v1/notifications", 500, 0.25);
    }

    #[test]
    fn test_record_moderation_and_rewards() {
        record_submission_moderation("approved");
        record_submission_moderation("rejected");
        record_rifas_credited("mission_reward", 15);
        record_rifas_credited("referral_bonus", 30);
        record_cashback_credited(250);
    }

    #[test]
    fn test_record_spending() {
        record_rifas_debited("crm_unlock", 50);
        record_rifas_debited("raffle_entry", 30);
        record_crm_unlock(true);
        record_crm_unlock(false);
        record_raffle_entries_sold(3);
        record_raffle_draw();
    }

    #[test]
    fn test_record_purchases_and_referrals() {
        record_credit_purchase("pending");
        record_credit_purchase("confirmed");
        record_credit_purchase("failed");
        record_referral_completed();
        record_notifications_sent("system", 2);
        record_notifications_sent("promotion", 2_500);
    }

    #[test]
    fn test_metrics_with_edge_cases() {
        record_http_request("", "", 0, 0.0);
        record_http_request("GET", "/very/long/path/that/exceeds/normal/limits", 999, f64::MAX);
        record_rifas_credited("", 0);
        record_rifas_debited("raffle_entry", i64::MAX);
        record_notifications_sent("system", 0);
    }
}

// ============================================================================
// 中间件类型测试
// ============================================================================

mod middleware_tests {
    use premiads_shared::observability::middleware::RequestId;

    #[test]
    fn test_request_id_access() {
        let id = RequestId("req-abc-123".to_string());
        assert_eq!(id.as_str(), "req-abc-123");
    }

    #[test]
    fn test_request_id_clone() {
        let id = RequestId("req-1".to_string());
        let cloned = id.clone();
        assert_eq!(id.as_str(), cloned.as_str());
    }
}

// ============================================================================
// 配置与日志过滤测试
// ============================================================================

mod config_tests {
    use premiads_shared::config::ObservabilityConfig;
    use premiads_shared::observability::ObservabilityGuard;
    use premiads_shared::observability::tracing::build_env_filter;

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.log_level, "info");
        assert!(config.metrics_enabled);
        assert!(!config.json_logs());
    }

    #[test]
    fn test_json_format_case_insensitive() {
        let config = ObservabilityConfig {
            log_format: "JSON".to_string(),
            ..Default::default()
        };
        assert!(config.json_logs());
    }

    #[test]
    fn test_env_filter_accepts_directives() {
        let _simple = build_env_filter("debug");
        let _directives = build_env_filter("info,premiads_functions=debug,sqlx=warn");
    }

    #[test]
    fn test_empty_guard() {
        let _guard = ObservabilityGuard::empty();
    }
}
