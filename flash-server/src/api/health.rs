//! 健康检查

use shared::ApiResponse;

pub async fn health_check() -> ApiResponse<()> {
    ApiResponse::ok()
}
