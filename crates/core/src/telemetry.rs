use crate::config::Settings;
use std::borrow::Cow;

/// Starts the Sentry client when `SENTRY_DSN` is configured.
///
/// Binaries pass `sentry::release_name!()` so events carry their own crate name.
/// Keep the guard alive for the process lifetime; dropping it flushes pending events.
pub fn init_sentry(
    settings: &Settings,
    release: Option<Cow<'static, str>>,
) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release,
            ..Default::default()
        },
    )))
}
