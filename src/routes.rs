use crate::{
    api::{allocation, attendance, holiday, leave_grade, leave_request, ledger, me},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::{Context, Result};

type Limit = GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per-route limiter settings. Built once at startup so every worker
/// shares the same buckets.
pub struct RateLimits {
    login: Limit,
    refresh: Limit,
    protected: Limit,
}

fn build_limit(requests_per_min: u32) -> Result<Limit> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        60_000 / requests_per_min as u64
    };
    GovernorConfigBuilder::default()
        .per_millisecond(per_ms.max(1))
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .with_context(|| format!("invalid rate limit of {} per minute", requests_per_min))
}

impl RateLimits {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(RateLimits {
            login: build_limit(config.rate_login_per_min)?,
            refresh: build_limit(config.rate_refresh_per_min)?,
            protected: build_limit(config.rate_protected_per_min)?,
        })
    }
}

pub fn configure(cfg: &mut web::ServiceConfig, api_prefix: &str, limits: &RateLimits) {
    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(Governor::new(&limits.login))
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(Governor::new(&limits.refresh))
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(Governor::new(&limits.login))
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(Governor::new(&limits.protected))
            .service(
                web::scope("/leave")
                    .service(
                        web::resource("")
                            .route(web::get().to(leave_request::leave_list))
                            .route(web::post().to(leave_request::create_leave)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(leave_request::get_leave))
                            .route(web::put().to(leave_request::update_leave))
                            .route(web::delete().to(leave_request::delete_leave)),
                    )
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(leave_request::approve_leave)),
                    )
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(leave_request::reject_leave)),
                    )
                    .service(
                        web::resource("/{id}/cancel")
                            .route(web::put().to(leave_request::cancel_leave)),
                    ),
            )
            .service(
                web::scope("/allocations")
                    .service(
                        web::resource("")
                            .route(web::get().to(allocation::list_allocations))
                            .route(web::post().to(allocation::create_allocation)),
                    )
                    // fixed segments before /{id}
                    .service(
                        web::resource("/bulk").route(web::post().to(allocation::bulk_allocate)),
                    )
                    .service(
                        web::resource("/import").route(web::post().to(allocation::import_leaves)),
                    )
                    .service(
                        web::resource("/adjust")
                            .route(web::post().to(allocation::adjust_allocation)),
                    )
                    .service(
                        web::resource("/carry-forward")
                            .route(web::post().to(allocation::carry_forward)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(allocation::get_allocation))
                            .route(web::put().to(allocation::update_allocation))
                            .route(web::delete().to(allocation::delete_allocation)),
                    ),
            )
            .service(
                web::scope("/employees/{employee_id}")
                    .service(
                        web::resource("/balances")
                            .route(web::get().to(allocation::employee_balances)),
                    )
                    .service(
                        web::resource("/ledger").route(web::get().to(ledger::employee_ledger)),
                    ),
            )
            .service(
                web::scope("/leave-grades")
                    .service(
                        web::resource("")
                            .route(web::get().to(leave_grade::list_grades))
                            .route(web::post().to(leave_grade::create_grade)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(leave_grade::get_grade))
                            .route(web::put().to(leave_grade::update_grade))
                            .route(web::delete().to(leave_grade::delete_grade)),
                    ),
            )
            .service(
                web::scope("/holiday-calendars")
                    .service(
                        web::resource("")
                            .route(web::get().to(holiday::list_calendars))
                            .route(web::post().to(holiday::create_calendar)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(holiday::get_calendar))
                            .route(web::put().to(holiday::update_calendar))
                            .route(web::delete().to(holiday::delete_calendar)),
                    )
                    .service(
                        web::resource("/{id}/holidays").route(web::post().to(holiday::add_holiday)),
                    )
                    .service(
                        web::resource("/{id}/holidays/bulk")
                            .route(web::post().to(holiday::bulk_create_holidays)),
                    )
                    .service(
                        web::resource("/{id}/assign")
                            .route(web::post().to(holiday::assign_calendar)),
                    ),
            )
            .service(
                web::resource("/holidays/{id}")
                    .route(web::put().to(holiday::update_holiday))
                    .route(web::delete().to(holiday::delete_holiday)),
            )
            .service(
                web::scope("/attendance")
                    .service(
                        web::resource("/check-in").route(web::post().to(attendance::check_in)),
                    )
                    .service(
                        web::resource("/check-out").route(web::post().to(attendance::check_out)),
                    ),
            )
            .service(
                web::scope("/me")
                    .service(web::resource("/balances").route(web::get().to(me::my_balances)))
                    .service(web::resource("/leave").route(web::get().to(me::my_leave)))
                    .service(web::resource("/ledger").route(web::get().to(me::my_ledger)))
                    .service(web::resource("/holidays").route(web::get().to(me::my_holidays)))
                    .service(
                        web::resource("/notifications")
                            .route(web::get().to(me::my_notifications)),
                    )
                    .service(
                        web::resource("/notifications/{id}/read")
                            .route(web::put().to(me::mark_notification_read)),
                    ),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns new access_token and rotates refresh_token

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rate_still_builds() {
        assert!(build_limit(0).is_ok());
        assert!(build_limit(60).is_ok());
    }
}
