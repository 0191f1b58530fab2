// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-clinic configuration as returned by the clinic config provider.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Deposit used when a clinic does not configure one.
pub const DEFAULT_DEPOSIT_CENTS: i64 = 5000;

/// Opening hours for a single day, `HH:MM` 24-hour strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayHours {
    pub open: String,
    pub close: String,
}

impl DayHours {
    pub fn new(open: &str, close: &str) -> Self {
        Self {
            open: open.to_string(),
            close: close.to_string(),
        }
    }

    fn open_time(&self) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(&self.open, "%H:%M").ok()
    }

    fn close_time(&self) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(&self.close, "%H:%M").ok()
    }
}

/// Weekly opening hours. `None` means closed that day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessHours {
    #[serde(default)]
    pub monday: Option<DayHours>,
    #[serde(default)]
    pub tuesday: Option<DayHours>,
    #[serde(default)]
    pub wednesday: Option<DayHours>,
    #[serde(default)]
    pub thursday: Option<DayHours>,
    #[serde(default)]
    pub friday: Option<DayHours>,
    #[serde(default)]
    pub saturday: Option<DayHours>,
    #[serde(default)]
    pub sunday: Option<DayHours>,
}

impl BusinessHours {
    pub fn for_day(&self, day: Weekday) -> Option<&DayHours> {
        match day {
            Weekday::Mon => self.monday.as_ref(),
            Weekday::Tue => self.tuesday.as_ref(),
            Weekday::Wed => self.wednesday.as_ref(),
            Weekday::Thu => self.thursday.as_ref(),
            Weekday::Fri => self.friday.as_ref(),
            Weekday::Sat => self.saturday.as_ref(),
            Weekday::Sun => self.sunday.as_ref(),
        }
    }

    pub fn has_any(&self) -> bool {
        [
            &self.monday,
            &self.tuesday,
            &self.wednesday,
            &self.thursday,
            &self.friday,
            &self.saturday,
            &self.sunday,
        ]
        .iter()
        .any(|d| d.is_some())
    }
}

/// How the clinic completes bookings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingPlatform {
    /// Deposit collected through a payment link, staff confirm the time.
    #[default]
    #[serde(alias = "square", alias = "stripe")]
    PaymentLink,
    /// Multi-step online booking; the platform itself takes payment.
    #[serde(alias = "moxie")]
    Structured,
}

/// Provider roster for structured booking platforms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRoster {
    /// Normalized service name to platform menu item id.
    #[serde(default)]
    pub service_menu_items: BTreeMap<String, String>,
    /// Menu item id to number of eligible providers.
    #[serde(default)]
    pub service_provider_count: BTreeMap<String, u32>,
    /// Provider id to display name.
    #[serde(default)]
    pub provider_names: BTreeMap<String, String>,
}

/// Clinic configuration consumed by the turn pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicConfig {
    pub org_id: String,
    pub name: String,
    /// IANA zone name; unknown zones fall back to UTC.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub business_hours: BusinessHours,
    #[serde(default = "default_callback_sla")]
    pub callback_sla_hours: u32,
    #[serde(default)]
    pub deposit_amount_cents: i64,
    #[serde(default)]
    pub service_deposit_amount_cents: BTreeMap<String, i64>,
    #[serde(default)]
    pub service_price_text: BTreeMap<String, String>,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub booking_url: String,
    #[serde(default)]
    pub booking_platform: BookingPlatform,
    /// Patient-facing term to booking-platform service name. Keys lowercase.
    #[serde(default)]
    pub service_aliases: BTreeMap<String, String>,
    /// Generic service to its delivery variants. Keys lowercase.
    #[serde(default)]
    pub service_variants: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub providers: Option<ProviderRoster>,
}

fn default_timezone() -> String {
    "America/New_York".to_string()
}

fn default_callback_sla() -> u32 {
    12
}

fn normalize_service_key(service: &str) -> String {
    service.trim().to_lowercase()
}

impl ClinicConfig {
    /// A weekday 9-6 clinic with a $50 deposit and payment-link booking.
    pub fn new(org_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            org_id: org_id.into(),
            name: name.into(),
            timezone: default_timezone(),
            business_hours: BusinessHours {
                monday: Some(DayHours::new("09:00", "18:00")),
                tuesday: Some(DayHours::new("09:00", "18:00")),
                wednesday: Some(DayHours::new("09:00", "18:00")),
                thursday: Some(DayHours::new("09:00", "18:00")),
                friday: Some(DayHours::new("09:00", "17:00")),
                saturday: None,
                sunday: None,
            },
            callback_sla_hours: default_callback_sla(),
            deposit_amount_cents: DEFAULT_DEPOSIT_CENTS,
            service_deposit_amount_cents: BTreeMap::new(),
            service_price_text: BTreeMap::new(),
            services: Vec::new(),
            booking_url: String::new(),
            booking_platform: BookingPlatform::PaymentLink,
            service_aliases: BTreeMap::new(),
            service_variants: BTreeMap::new(),
            providers: None,
        }
    }

    pub fn uses_structured_booking(&self) -> bool {
        self.booking_platform == BookingPlatform::Structured
    }

    /// Clinic default deposit, or [`DEFAULT_DEPOSIT_CENTS`] when unset.
    pub fn default_deposit_cents(&self) -> i64 {
        if self.deposit_amount_cents > 0 {
            self.deposit_amount_cents
        } else {
            DEFAULT_DEPOSIT_CENTS
        }
    }

    /// Translates a patient-facing service name into the booking-platform name.
    ///
    /// Exact alias, then singular form, then the longest alias key that
    /// contains or is contained in the name. Unknown names pass through.
    pub fn resolve_service_name(&self, service: &str) -> String {
        if self.service_aliases.is_empty() {
            return service.to_string();
        }
        let key = normalize_service_key(service);
        if let Some(alias) = self.service_aliases.get(&key)
            && !alias.is_empty()
        {
            return alias.clone();
        }
        if let Some(singular) = key.strip_suffix('s')
            && let Some(alias) = self.service_aliases.get(singular)
            && !alias.is_empty()
        {
            return alias.clone();
        }
        let mut best: Option<(&str, usize)> = None;
        for (alias_key, alias) in &self.service_aliases {
            if alias.is_empty() {
                continue;
            }
            if (key.contains(alias_key.as_str()) || alias_key.contains(key.as_str()))
                && best.is_none_or(|(_, len)| alias_key.len() > len)
            {
                best = Some((alias.as_str(), alias_key.len()));
            }
        }
        match best {
            Some((alias, _)) => alias.to_string(),
            None => service.to_string(),
        }
    }

    /// Delivery variants for a service. Only lists with two or more entries count.
    pub fn service_variants(&self, service: &str) -> &[String] {
        let key = normalize_service_key(service);
        if key.is_empty() {
            return &[];
        }
        if let Some(variants) = self.service_variants.get(&key)
            && variants.len() > 1
        {
            return variants;
        }
        self.service_variants
            .iter()
            .find(|(variant_key, variants)| {
                variants.len() > 1
                    && (key.contains(variant_key.as_str()) || variant_key.contains(key.as_str()))
            })
            .map(|(_, variants)| variants.as_slice())
            .unwrap_or(&[])
    }

    /// Whether more than one provider can perform this service.
    pub fn service_needs_provider_preference(&self, service: &str) -> bool {
        let Some(roster) = &self.providers else {
            return false;
        };
        let resolved = self.resolve_service_name(service).to_lowercase();
        let item = roster
            .service_menu_items
            .get(&resolved)
            .or_else(|| roster.service_menu_items.get(&service.to_lowercase()));
        match item {
            Some(id) => roster.service_provider_count.get(id).copied().unwrap_or(0) > 1,
            None => false,
        }
    }

    /// Provider display names, sorted.
    pub fn provider_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .providers
            .as_ref()
            .map(|r| r.provider_names.values().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Per-service deposit override, then the clinic default. Zero when neither is set.
    pub fn deposit_amount_for_service(&self, service: &str) -> i64 {
        let key = normalize_service_key(service);
        if !key.is_empty()
            && let Some(amount) = self.service_deposit_amount_cents.get(&key)
            && *amount > 0
        {
            return *amount;
        }
        self.deposit_amount_cents.max(0)
    }

    pub fn price_text_for_service(&self, service: &str) -> Option<&str> {
        let key = normalize_service_key(service);
        if key.is_empty() {
            return None;
        }
        self.service_price_text
            .get(&key)
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
    }

    fn tz(&self) -> Tz {
        self.timezone.parse().unwrap_or(Tz::UTC)
    }

    /// Wall-clock time at the clinic.
    pub fn local_time(&self, at: DateTime<Utc>) -> NaiveDateTime {
        at.with_timezone(&self.tz()).naive_local()
    }

    /// Clinics with no configured hours at all are treated as always open.
    pub fn is_open_at(&self, at: DateTime<Utc>) -> bool {
        let local = at.with_timezone(&self.tz());
        let Some(hours) = self.business_hours.for_day(local.weekday()) else {
            return !self.business_hours.has_any();
        };
        match (hours.open_time(), hours.close_time()) {
            (Some(open), Some(close)) => {
                let now = local.time();
                now >= open && now < close
            }
            _ => false,
        }
    }

    /// Next opening instant in clinic-local time, or `at` itself when open.
    pub fn next_open_time(&self, at: DateTime<Utc>) -> DateTime<Tz> {
        let tz = self.tz();
        let local = at.with_timezone(&tz);
        for offset in 0..7 {
            let date = local.date_naive() + Duration::days(offset);
            let Some(hours) = self.business_hours.for_day(date.weekday()) else {
                continue;
            };
            let Some(open) = hours.open_time() else {
                continue;
            };
            let Some(open_at) = tz.from_local_datetime(&date.and_time(open)).earliest() else {
                continue;
            };
            if offset == 0 {
                if local < open_at {
                    return open_at;
                }
                let close_at = hours
                    .close_time()
                    .and_then(|c| tz.from_local_datetime(&date.and_time(c)).earliest());
                if close_at.is_some_and(|c| local < c) {
                    return local;
                }
                continue;
            }
            return open_at;
        }
        let tomorrow = local.date_naive() + Duration::days(1);
        tz.from_local_datetime(&tomorrow.and_time(NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default()))
            .earliest()
            .unwrap_or(local)
    }

    /// Human-friendly callback expectation, e.g. `tomorrow (Tuesday) around 9 AM`.
    pub fn expected_callback_time(&self, at: DateTime<Utc>) -> String {
        if self.is_open_at(at) {
            return "shortly".to_string();
        }
        let local = at.with_timezone(&self.tz());
        let next = self.next_open_time(at);
        let hour = next.format("%-I %p");
        if next.date_naive() == local.date_naive() {
            return format!("this {} around {hour}", next.format("%A").to_string().to_lowercase());
        }
        if next.date_naive() == local.date_naive() + Duration::days(1) {
            return format!("tomorrow ({}) around {hour}", next.format("%A"));
        }
        if (next.date_naive() - local.date_naive()).num_days() <= 6 {
            return format!("on {} around {hour}", next.format("%A"));
        }
        format!("on {} around {hour}", next.format("%A, %B %-d"))
    }

    /// Current open/closed status and callback guidance for the LLM.
    pub fn business_hours_context(&self, at: DateTime<Utc>) -> String {
        let local = at.with_timezone(&self.tz());
        let open = self.is_open_at(at);
        let today = self
            .business_hours
            .for_day(local.weekday())
            .map(|h| format!("{} - {}", h.open, h.close))
            .unwrap_or_else(|| "Closed today".to_string());

        let mut ctx = format!(
            "Clinic: {}\nCurrent time: {} ({})\nStatus: {}\nToday's hours: {}\n",
            self.name,
            local.format("%A, %B %-d, %Y %-I:%M %p"),
            self.timezone,
            if open { "OPEN" } else { "CLOSED" },
            today,
        );
        if open {
            ctx.push_str("CALLBACK INSTRUCTION: We're currently open! Our team can reach out shortly.\n");
        } else {
            ctx.push_str(&format!(
                "Next open: {}\n",
                self.next_open_time(at).format("%A at %-I:%M %p")
            ));
            ctx.push_str(&format!(
                "CALLBACK INSTRUCTION: When the clinic is closed, tell patients our team will reach out around {}. NEVER say '24 hours' if we're closed for the weekend or holiday.\n",
                self.expected_callback_time(at)
            ));
        }
        ctx.push_str(&format!(
            "Callback SLA: {} business hours\n",
            self.callback_sla_hours
        ));
        ctx
    }
}
