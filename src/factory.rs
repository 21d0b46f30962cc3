//! Assembly of the monitoring pipeline from configuration.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use keywatch_adapters::http::HttpClient;
use keywatch_adapters::{
    parse_list_file, BlsKeysFetcher, LogNotifier, Notifier, PushoverNotifier, SlackNotifier,
    SmtpNotifier, TelegramNotifier, ValidatorStatisticsQuerier,
};

use crate::checker::RatingsChecker;
use crate::config::{AlarmSnoozeConfig, AllConfigs, BlsKeysMonitorConfig, GeneralConfig};
use crate::executor::KeysExecutor;
use crate::fanout::NotificationFanout;
use crate::poller::{Closer, DisabledCloser, Poller};
use crate::snooze::{DisabledKeysFilter, FaultySnoozeCache, KeysFilter};
use crate::status::{DisabledStatusHandler, StatusHandler, StatusReporter};
use crate::trigger::{CalendarTrigger, TriggerDay};
use crate::MonitorError;

/// Wait between two per-address key queries.
pub const TIME_BETWEEN_BLS_KEYS_FETCH: Duration = Duration::from_secs(1);

/// Smallest polling interval a keys monitor accepts.
pub const MIN_MONITOR_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Wait before retrying a monitor whose last cycle failed.
pub const MONITOR_ERROR_INTERVAL: Duration = Duration::from_secs(10);

/// Time given to in-flight cycles after the close message went out.
pub const CLOSE_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// The running application.
pub struct Monitoring {
    pub fanout: Arc<NotificationFanout>,
    pub status: Arc<dyn StatusReporter>,
    /// Self-check poller first, then one poller per monitor.
    pub closers: Vec<Box<dyn Closer>>,
}

impl Monitoring {
    /// Close every poller. Failures are logged and do not stop the others.
    pub fn close_all(&self) {
        for closer in &self.closers {
            if let Err(err) = closer.close() {
                tracing::error!(error = %err, "error closing component");
            }
        }
    }

    /// Send the close message, wait [`CLOSE_GRACE_PERIOD`], then close
    /// every poller.
    pub async fn shutdown(&self) {
        self.status.send_close_message().await;
        tokio::time::sleep(CLOSE_GRACE_PERIOD).await;
        self.close_all();
    }
}

/// Log notifier first, then every enabled channel, one instance per
/// credential entry.
pub fn create_output_notifiers(all: &AllConfigs) -> Result<Vec<Arc<dyn Notifier>>> {
    let outputs = &all.config.output_notifiers;
    let credentials = &all.credentials;

    let mut notifiers: Vec<Arc<dyn Notifier>> = vec![Arc::new(LogNotifier::new())];
    tracing::debug!("created log notifier");

    if outputs.pushover.enabled {
        for entry in credentials.pushover.all() {
            let notifier =
                PushoverNotifier::with_url(&outputs.pushover.url, entry.token, entry.user_key)
                    .context("creating pushover notifier")?;
            notifiers.push(Arc::new(notifier));
            tracing::debug!("created pushover notifier");
        }
    }
    if outputs.smtp.enabled {
        let smtp = &outputs.smtp;
        let notifier = SmtpNotifier::with_server(
            &smtp.smtp_host,
            smtp.smtp_port,
            &credentials.smtp.email,
            &credentials.smtp.password,
            &smtp.to,
        )
        .context("creating smtp notifier")?;
        notifiers.push(Arc::new(notifier));
        tracing::debug!(host = %smtp.smtp_host, "created smtp notifier");
    }
    if outputs.telegram.enabled {
        for entry in credentials.telegram.all() {
            let notifier =
                TelegramNotifier::with_url(&outputs.telegram.url, entry.token, entry.chat_id)
                    .context("creating telegram notifier")?;
            notifiers.push(Arc::new(notifier));
            tracing::debug!("created telegram notifier");
        }
    }
    if outputs.slack.enabled {
        for entry in credentials.slack.all() {
            let notifier = SlackNotifier::with_url(&outputs.slack.url, entry.secret)
                .context("creating slack notifier")?;
            notifiers.push(Arc::new(notifier));
            tracing::debug!("created slack notifier");
        }
    }

    Ok(notifiers)
}

pub fn create_fanout(all: &AllConfigs) -> Result<Arc<NotificationFanout>> {
    let notifiers = create_output_notifiers(all)?;
    let outputs = &all.config.output_notifiers;
    let fanout = NotificationFanout::new(
        notifiers,
        outputs.num_retries,
        Duration::from_secs(outputs.seconds_between_retries),
    )
    .context("creating notification fanout")?;

    Ok(Arc::new(fanout))
}

/// The self-check handler and the poller driving its trigger. Both are
/// no-ops when the self-check is disabled.
pub fn create_status_handler(
    general: &GeneralConfig,
    fanout: Arc<NotificationFanout>,
) -> Result<(Arc<dyn StatusReporter>, Box<dyn Closer>)> {
    let self_check = &general.system_self_check;
    if !self_check.enabled {
        let status: Arc<dyn StatusReporter> = Arc::new(DisabledStatusHandler);
        let closer: Box<dyn Closer> = Box::new(DisabledCloser);
        return Ok((status, closer));
    }

    let handler = Arc::new(StatusHandler::new(&general.application_name, fanout));
    let day: TriggerDay = self_check.day_of_week.parse()?;
    let trigger = CalendarTrigger::builder()
        .executor(handler.clone())
        .day(day)
        .hour(self_check.hour)
        .minute(self_check.minute)
        .build()
        .context("creating self-check trigger")?;

    let interval = Duration::from_secs(self_check.polling_interval_in_sec);
    let poller = Poller::builder()
        .name(&general.application_name)
        .executor(Arc::new(trigger))
        .interval(interval)
        .error_interval(interval)
        .build()
        .context("creating self-check poller")?;
    poller.start_processing_loop()?;

    let status: Arc<dyn StatusReporter> = handler;
    let closer: Box<dyn Closer> = Box::new(poller);
    Ok((status, closer))
}

pub fn create_keys_filter(snooze: &AlarmSnoozeConfig) -> Arc<dyn KeysFilter> {
    if !snooze.enabled {
        return Arc::new(DisabledKeysFilter);
    }

    Arc::new(FaultySnoozeCache::new(
        snooze.num_notifications_for_each_faulty_key,
        snooze.snooze_time_in_sec,
    ))
}

/// Build and start the poller for one monitored network.
pub fn create_bls_keys_monitor(
    config: &BlsKeysMonitorConfig,
    snooze: &AlarmSnoozeConfig,
    fanout: Arc<NotificationFanout>,
    status: Arc<dyn StatusReporter>,
) -> Result<Poller> {
    let identities = parse_list_file(&config.list_file)
        .with_context(|| format!("reading {}", config.list_file.display()))?;

    let checker = RatingsChecker::new(
        &config.name,
        identities.bls_hex_keys,
        config.alarm_delta_rating_drop,
    )?;

    let client = Arc::new(HttpClient::builder().base_url(&config.api_url).build()?);
    let querier = ValidatorStatisticsQuerier::new(client.clone());
    let fetcher = BlsKeysFetcher::new(client, identities.addresses, TIME_BETWEEN_BLS_KEYS_FETCH);

    let executor = KeysExecutor::builder()
        .name(&config.name)
        .explorer_url(&config.explorer_url)
        .statistics_querier(Arc::new(querier))
        .keys_fetcher(Arc::new(fetcher))
        .ratings_checker(Arc::new(checker))
        .keys_filter(create_keys_filter(snooze))
        .status_reporter(status)
        .fanout(fanout)
        .build()?;
    let name = executor.name().to_string();

    let interval = Duration::from_secs(config.polling_interval_in_seconds);
    if interval < MIN_MONITOR_POLL_INTERVAL {
        return Err(MonitorError::InvalidInterval(interval, MIN_MONITOR_POLL_INTERVAL).into());
    }

    let poller = Poller::builder()
        .name(&config.name)
        .executor(Arc::new(executor))
        .interval(interval)
        .error_interval(MONITOR_ERROR_INTERVAL)
        .build()?;
    poller.start_processing_loop()?;
    tracing::info!(monitor = %name, api_url = %config.api_url, "started keys monitor");

    Ok(poller)
}

/// Assemble every component and start all pollers.
pub fn start_monitoring(all: &AllConfigs) -> Result<Monitoring> {
    let fanout = create_fanout(all)?;
    let (status, status_closer) = create_status_handler(&all.config.general, fanout.clone())?;

    let mut closers = vec![status_closer];
    for monitor in &all.config.bls_keys_monitoring {
        let poller = create_bls_keys_monitor(
            monitor,
            &all.config.general.alarm_snooze,
            fanout.clone(),
            status.clone(),
        )
        .with_context(|| format!("creating monitor {:?}", monitor.name))?;
        closers.push(Box::new(poller));
    }

    Ok(Monitoring {
        fanout,
        status,
        closers,
    })
}
