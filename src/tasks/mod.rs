//! 后台定时任务；启动时调用一次 `spawn_all`

use chrono::Utc;

use crate::services::EventService;

/// 启动所有后台任务（通过 `tokio::spawn` 分离，不阻塞）
pub fn spawn_all(event_service: EventService, registration_sweep_interval_secs: u64) {
    // 关闭已过报名截止时间的活动
    {
        let svc = event_service.clone();
        let interval = registration_sweep_interval_secs.max(1);
        tokio::spawn(async move {
            loop {
                match svc.close_expired_registrations(Utc::now()).await {
                    Ok(n) if n > 0 => log::info!("Closed registration for {n} event(s)"),
                    Ok(_) => {}
                    Err(e) => log::error!("Failed to close expired registrations: {e:?}"),
                }
                tokio::time::sleep(std::time::Duration::from_secs(interval)).await;
            }
        });
    }
}
