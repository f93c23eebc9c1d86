//! API 路由
//!
//! 公开：注册/登录/刷新、商品浏览、支付回调（签名在网关预校验）。
//! 认证：秒杀、订单、优惠券、VIP、商品管理。
//! 风控开启时挂黑/灰名单门禁与双层限流。

pub mod coupons;
pub mod health;
pub mod orders;
pub mod payment;
pub mod products;
pub mod seckill;
pub mod trace;
pub mod users;
pub mod vip;

use axum::routing::{get, post, put};
use axum::{middleware, Router};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;

use crate::auth;
use crate::core::AppState;
use crate::limiter::middleware as limit;
use crate::risk;

/// 组装完整路由
pub fn create_router(state: AppState) -> Router {
    let risk_enabled = state.config.risk.enable;

    let public = Router::new()
        .route("/register", post(users::register))
        .route("/refresh", post(users::refresh))
        .route("/products", get(products::list))
        .route("/product/{id}", get(products::detail));

    let mut login = Router::new().route("/login", post(users::login));
    if risk_enabled {
        login = login.layer(middleware::from_fn_with_state(
            state.clone(),
            limit::login_limiter,
        ));
    }

    let mut callback = Router::new().route("/payment/callback", post(payment::callback));
    if risk_enabled {
        callback = callback.layer(middleware::from_fn_with_state(
            state.clone(),
            limit::pay_limiter,
        ));
    }

    let mut seckill_route = Router::new().route("/seckill", post(seckill::seckill));
    if risk_enabled {
        // 外层路由级限流先挡，内层再按 product_id 限热点
        seckill_route = seckill_route
            .layer(middleware::from_fn_with_state(
                state.clone(),
                limit::product_param_limiter,
            ))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                limit::seckill_limiter,
            ));
    }

    let authed = Router::new()
        .route("/profile", get(users::profile).put(users::update_profile))
        .route("/vip/profile", get(vip::profile))
        .route("/vip/purchase", post(vip::purchase))
        .route("/coupons/mine", get(coupons::list_mine))
        .route("/coupons/purchase", post(coupons::purchase))
        .route("/products", post(products::create))
        .route("/products/mine", get(products::list_mine))
        .route(
            "/products/{id}",
            put(products::update).delete(products::delete),
        )
        .route("/orders", get(orders::list))
        .route("/orders/{id}", get(orders::detail))
        .route("/orders/poll/{order_num}", get(orders::poll))
        .route("/orders/{id}/apply-coupon", post(orders::apply_coupon))
        .merge(seckill_route)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    let api = Router::new()
        .merge(public)
        .merge(login)
        .merge(callback)
        .merge(authed);

    let mut app = Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", api);

    if risk_enabled {
        app = app.layer(middleware::from_fn_with_state(
            state.clone(),
            risk::risk_gate,
        ));
    }

    app.layer(CatchPanicLayer::custom(trace::handle_panic))
        .layer(middleware::from_fn(trace::request_span))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
