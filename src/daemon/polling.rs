use crate::core::models::Service;
use chrono::{DateTime, TimeZone, Timelike};
use std::time::Duration;

pub const EARNAPP_ANCHOR_MINUTE: u32 = 5;
pub const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

const HOUR: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Every(Duration),
    HourlyAt { minute: u32 },
}

impl Cadence {
    pub fn for_service(service: Service, honeygain_interval: Duration) -> Self {
        match service {
            Service::EarnApp => Cadence::HourlyAt {
                minute: EARNAPP_ANCHOR_MINUTE,
            },
            Service::Honeygain => Cadence::Every(honeygain_interval),
        }
    }

    pub fn delay_from<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Duration {
        match *self {
            Cadence::Every(interval) => interval,
            Cadence::HourlyAt { minute } => delay_until_minute(now, minute),
        }
    }
}

pub fn delay_until_minute<Tz: TimeZone>(now: &DateTime<Tz>, minute: u32) -> Duration {
    let target = Duration::from_secs(u64::from(minute.min(59)) * 60);
    // Leap seconds report nanoseconds >= 1e9.
    let nanos = now.nanosecond().min(999_999_999);
    let into_hour =
        Duration::from_secs(u64::from(now.minute()) * 60 + u64::from(now.second()))
            + Duration::from_nanos(u64::from(nanos));

    if into_hour < target {
        target - into_hour
    } else {
        HOUR - into_hour + target
    }
}
