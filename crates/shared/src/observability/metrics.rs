//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::ObservabilityConfig;

/// 全局 Prometheus handle，用于渲染指标
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics 资源守卫
pub struct MetricsHandle {
    _server_handle: tokio::task::JoinHandle<()>,
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 端点。
pub async fn init(config: &ObservabilityConfig, service_name: &str) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    let _ = PROMETHEUS_HANDLE.set(handle.clone());

    register_common_metrics(service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle {
        _server_handle: server_handle,
    })
}

/// 注册通用指标描述，出现在 /metrics 的 HELP 注释中
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    metrics::describe_counter!(
        "submissions_moderated_total",
        "Mission submissions approved or rejected"
    );
    metrics::describe_counter!("rifas_credited_total", "Rifas credited to profiles");
    metrics::describe_counter!("rifas_debited_total", "Rifas debited from profiles");
    metrics::describe_counter!("cashback_credited_cents_total", "Cashback credited in cents");
    metrics::describe_counter!("crm_unlocks_total", "CRM data unlocks");
    metrics::describe_counter!("raffle_draws_total", "Raffle draws executed");
    metrics::describe_counter!("raffle_entries_sold_total", "Raffle tickets sold");
    metrics::describe_counter!(
        "credit_purchases_total",
        "Credit purchases by resulting status"
    );
    metrics::describe_counter!("referrals_completed_total", "Referrals completed");
    metrics::describe_counter!("notifications_sent_total", "Notifications written");

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 启动指标 HTTP 服务器
async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

/// 获取全局 Prometheus handle（用于自定义渲染）
pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

// ============================================================================
// 便捷的指标记录函数
// ============================================================================

/// 记录 HTTP 请求
#[inline]
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str.clone()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str
    )
    .record(duration_secs);
}

/// 记录任务提交审核结果
#[inline]
pub fn record_submission_moderation(outcome: &str) {
    metrics::counter!("submissions_moderated_total", "outcome" => outcome.to_string())
        .increment(1);
}

/// 记录 rifas 入账
#[inline]
pub fn record_rifas_credited(kind: &str, amount: i64) {
    if amount > 0 {
        metrics::counter!("rifas_credited_total", "kind" => kind.to_string())
            .increment(amount as u64);
    }
}

/// 记录 rifas 扣减
#[inline]
pub fn record_rifas_debited(kind: &str, amount: i64) {
    if amount > 0 {
        metrics::counter!("rifas_debited_total", "kind" => kind.to_string())
            .increment(amount as u64);
    }
}

/// 记录 cashback 入账
#[inline]
pub fn record_cashback_credited(cents: i64) {
    if cents > 0 {
        metrics::counter!("cashback_credited_cents_total").increment(cents as u64);
    }
}

#[inline]
pub fn record_crm_unlock(charged: bool) {
    metrics::counter!("crm_unlocks_total", "charged" => charged.to_string()).increment(1);
}

#[inline]
pub fn record_raffle_draw() {
    metrics::counter!("raffle_draws_total").increment(1);
}

#[inline]
pub fn record_raffle_entries_sold(quantity: u64) {
    metrics::counter!("raffle_entries_sold_total").increment(quantity);
}

/// 记录充值订单状态变化
#[inline]
pub fn record_credit_purchase(status: &str) {
    metrics::counter!("credit_purchases_total", "status" => status.to_string()).increment(1);
}

#[inline]
pub fn record_referral_completed() {
    metrics::counter!("referrals_completed_total").increment(1);
}

#[inline]
pub fn record_notifications_sent(kind: &str, count: u64) {
    metrics::counter!("notifications_sent_total", "kind" => kind.to_string()).increment(count);
}
