//! In-process registration validator that fabricates endpoint responses

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tracing::debug;

use regcheck_common::{ExecutionOutcome, HarnessConfig, Payload, MAX_DURATION_SECS};

use crate::error::E2eResult;
use crate::executor::Executor;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 8;

const SQL_PATTERN: &str = "DROP TABLE";
const XSS_PATTERN: &str = "<script>";

/// First rule a payload violates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    UsernameRequired,
    UsernameTooShort,
    SqlInjection,
    ScriptInjection,
    EmailRequired,
    EmailInvalid,
    PasswordRequired,
    PasswordTooShort,
}

impl ValidationError {
    pub fn message(&self) -> &'static str {
        match self {
            ValidationError::UsernameRequired => "Username is required",
            ValidationError::UsernameTooShort => "Username must be at least 3 characters",
            ValidationError::SqlInjection | ValidationError::ScriptInjection => {
                "Invalid characters in username"
            }
            ValidationError::EmailRequired => "Email is required",
            ValidationError::EmailInvalid => "Please enter a valid email address",
            ValidationError::PasswordRequired => "Password is required",
            ValidationError::PasswordTooShort => "Password must be at least 8 characters",
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Apply the registration rules in their fixed evaluation order.
///
/// Username rules (including the injection patterns) are checked before any
/// email or password rule, so a malicious username is always reported as
/// such whatever the other fields hold.
pub fn validate(payload: &Payload) -> Result<(), ValidationError> {
    let username = payload.value("username");
    let email = payload.value("email");
    let password = payload.value("password");

    if username.is_empty() {
        return Err(ValidationError::UsernameRequired);
    }
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(ValidationError::UsernameTooShort);
    }
    if username.contains(SQL_PATTERN) {
        return Err(ValidationError::SqlInjection);
    }
    if username.contains(XSS_PATTERN) {
        return Err(ValidationError::ScriptInjection);
    }
    if email.is_empty() {
        return Err(ValidationError::EmailRequired);
    }
    if !email.contains('@') {
        return Err(ValidationError::EmailInvalid);
    }
    if password.is_empty() {
        return Err(ValidationError::PasswordRequired);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

/// Bounded uniform latency attached to every simulated response
#[derive(Debug, Clone, Copy)]
pub struct LatencyProfile {
    pub min: Duration,
    pub max: Duration,
}

impl Default for LatencyProfile {
    fn default() -> Self {
        Self {
            min: Duration::from_millis(100),
            max: Duration::from_millis(2000),
        }
    }
}

impl LatencyProfile {
    /// Bounds are clamped to `[0.001, MAX_DURATION_SECS]`; NaN takes the floor
    pub fn from_secs(min: f64, max: f64) -> Self {
        let bounded = |secs: f64| Duration::from_secs_f64(secs.max(0.001).min(MAX_DURATION_SECS));
        let min = bounded(min);
        let max = bounded(max).max(min);
        Self { min, max }
    }

    fn sample(&self, rng: &mut StdRng) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        Duration::from_secs_f64(rng.gen_range(self.min.as_secs_f64()..=self.max.as_secs_f64()))
    }
}

/// Simulated executor: deterministic validation, seeded latency
pub struct SimulatedExecutor {
    rng: StdRng,
    latency: LatencyProfile,
    realtime: bool,
    environment: String,
}

impl SimulatedExecutor {
    /// Executor with an explicit seed; the same seed yields the same latencies
    pub fn seeded(seed: u64, latency: LatencyProfile) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            latency,
            realtime: false,
            environment: "simulated".to_string(),
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        let sim = &config.simulated;
        let seed = sim.seed.unwrap_or_else(rand::random);
        debug!("Simulated executor seed: {}", seed);
        Self {
            realtime: sim.realtime,
            environment: config.target.base_url.clone(),
            ..Self::seeded(
                seed,
                LatencyProfile::from_secs(sim.latency_min_secs, sim.latency_max_secs),
            )
        }
    }

    /// Sleep for the sampled latency instead of only reporting it
    pub fn realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Fabricate the response the registration endpoint would give
    pub fn respond(&mut self, payload: &Payload) -> ExecutionOutcome {
        let elapsed = self.latency.sample(&mut self.rng);
        match validate(payload) {
            Ok(()) => {
                let user_id: u32 = self.rng.gen_range(1000..=9999);
                ExecutionOutcome::success(
                    Some(201),
                    format!("Registration successful (user_id {})", user_id),
                    elapsed,
                )
            }
            Err(err) => ExecutionOutcome::failure(Some(400), err.message(), elapsed),
        }
    }
}

#[async_trait]
impl Executor for SimulatedExecutor {
    fn name(&self) -> &str {
        "simulated"
    }

    fn environment(&self) -> String {
        self.environment.clone()
    }

    async fn execute(&mut self, payload: &Payload) -> E2eResult<ExecutionOutcome> {
        let outcome = self.respond(payload);
        if self.realtime {
            tokio::time::sleep(outcome.elapsed).await;
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn payload(username: &str, email: &str, password: &str) -> Payload {
        Payload::new()
            .with("username", username)
            .with("email", email)
            .with("password", password)
    }

    #[test_case("", "a@b.com", "LongEnough1!", "Username is required" ; "empty username")]
    #[test_case("ab", "a@b.com", "LongEnough1!", "Username must be at least 3 characters" ; "short username")]
    #[test_case("validuser", "", "LongEnough1!", "Email is required" ; "empty email")]
    #[test_case("validuser", "nope", "LongEnough1!", "Please enter a valid email address" ; "email without at")]
    #[test_case("validuser", "v@b.com", "", "Password is required" ; "empty password")]
    #[test_case("validuser", "v@b.com", "short", "Password must be at least 8 characters" ; "short password")]
    #[test_case("admin'; DROP TABLE users; --", "v@b.com", "LongEnough1!", "Invalid characters in username" ; "sql")]
    #[test_case("<script>alert(1)</script>", "v@b.com", "LongEnough1!", "Invalid characters in username" ; "xss")]
    fn test_first_violated_rule(username: &str, email: &str, password: &str, expected: &str) {
        let err = validate(&payload(username, email, password)).unwrap_err();
        assert_eq!(err.message(), expected);
    }

    #[test_case("x DROP TABLE y", "", "" ; "sql with missing fields")]
    #[test_case("<script>", "not-an-email", "1" ; "xss with invalid fields")]
    fn test_injection_wins_over_other_fields(username: &str, email: &str, password: &str) {
        let err = validate(&payload(username, email, password)).unwrap_err();
        assert_eq!(err.message(), "Invalid characters in username");
    }

    #[test]
    fn test_missing_fields_count_as_empty() {
        assert_eq!(validate(&Payload::new()), Err(ValidationError::UsernameRequired));
    }

    #[test]
    fn test_success_yields_201() {
        let mut executor = SimulatedExecutor::seeded(7, LatencyProfile::default());
        let outcome = executor.respond(&payload("validuser", "v@b.com", "LongEnough1!"));
        assert!(outcome.success);
        assert_eq!(outcome.status_code, Some(201));
        assert!(outcome.message.unwrap().starts_with("Registration successful"));
    }

    #[test]
    fn test_short_username_yields_400() {
        let mut executor = SimulatedExecutor::seeded(7, LatencyProfile::default());
        let outcome = executor.respond(&payload("ab", "a@b.com", "LongEnough1!"));
        assert!(!outcome.success);
        assert_eq!(outcome.status_code, Some(400));
        assert_eq!(
            outcome.message.as_deref(),
            Some("Username must be at least 3 characters")
        );
    }

    #[test]
    fn test_latency_is_bounded_and_seeded() {
        let profile = LatencyProfile::from_secs(0.1, 2.0);
        let mut a = SimulatedExecutor::seeded(99, profile);
        let mut b = SimulatedExecutor::seeded(99, profile);
        let p = payload("validuser", "v@b.com", "LongEnough1!");
        for _ in 0..50 {
            let x = a.respond(&p);
            let y = b.respond(&p);
            assert_eq!(x.elapsed, y.elapsed);
            assert_eq!(x.message, y.message);
            assert!(x.elapsed >= profile.min && x.elapsed <= profile.max);
            assert!(x.elapsed > Duration::ZERO);
        }
    }

    #[test]
    fn test_out_of_range_latency_is_clamped() {
        let cap = Duration::from_secs_f64(MAX_DURATION_SECS);
        let profile = LatencyProfile::from_secs(1e30, f64::INFINITY);
        assert_eq!((profile.min, profile.max), (cap, cap));

        let profile = LatencyProfile::from_secs(f64::NAN, 1e30);
        assert_eq!(profile.min, Duration::from_millis(1));
        assert_eq!(profile.max, cap);

        let mut executor = SimulatedExecutor::seeded(3, profile);
        let outcome = executor.respond(&Payload::new());
        assert!(outcome.elapsed <= cap);
    }

    #[test]
    fn test_fixed_latency_profile() {
        let profile = LatencyProfile::from_secs(0.5, 0.5);
        let mut executor = SimulatedExecutor::seeded(1, profile);
        let outcome = executor.respond(&Payload::new());
        assert_eq!(outcome.elapsed, Duration::from_millis(500));
    }
}
