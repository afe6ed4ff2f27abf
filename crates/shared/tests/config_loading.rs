//! 配置加载集成测试
//!
//! 验证配置文件分层与环境变量覆盖顺序。环境变量为进程级全局状态，
//! 所有断言放在同一个测试函数中顺序执行。

use std::fs;

use premiads_shared::config::AppConfig;

#[test]
fn test_layered_config_loading() {
    let dir = std::env::temp_dir().join(format!("premiads-config-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();

    fs::write(
        dir.join("default.toml"),
        r#"
[server]
port = 7000

[rewards]
crm_unlock_cost = 80
referral_bonus_rifas = 30

[cors]
allowed_origins = "*"
"#,
    )
    .unwrap();

    fs::write(
        dir.join("loader-test-service.toml"),
        r#"
[rewards]
referral_bonus_rifas = 45
"#,
    )
    .unwrap();

    // SAFETY: 本测试二进制中只有这一个测试修改环境变量
    unsafe {
        std::env::set_var("CONFIG_DIR", &dir);
        std::env::set_var("PREMIADS_AUTH__JWT_SECRET", "from-env-secret");
        std::env::set_var("LOADER_TEST_SERVICE_PORT", "7100");
    }

    let config = AppConfig::load("loader-test-service").expect("config should load");

    assert_eq!(config.service_name, "loader-test-service");
    assert_eq!(config.environment, "development");
    // 服务端口环境变量优先于配置文件
    assert_eq!(config.server.port, 7100);
    // default.toml 生效
    assert_eq!(config.rewards.crm_unlock_cost, 80);
    assert!(config.cors.allows_any());
    // 服务配置覆盖 default.toml
    assert_eq!(config.rewards.referral_bonus_rifas, 45);
    // 未配置的字段保持默认值
    assert_eq!(config.rewards.referred_bonus_rifas, 10);
    assert_eq!(config.database.max_connections, 10);
    // 环境变量覆盖嵌套字段
    assert_eq!(config.auth.jwt_secret, "from-env-secret");

    unsafe {
        std::env::remove_var("CONFIG_DIR");
        std::env::remove_var("PREMIADS_AUTH__JWT_SECRET");
        std::env::remove_var("LOADER_TEST_SERVICE_PORT");
    }
    let _ = fs::remove_dir_all(&dir);
}
