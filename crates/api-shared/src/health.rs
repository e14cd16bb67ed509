use crate::pb::HealthRes;

/// Liveness report for the REST API.
///
/// `/health` answers without an API key, so it never touches the database.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "Clinica is alive".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_alive_as_json() {
        let json = serde_json::to_value(HealthService::check_health()).expect("serialize");
        assert_eq!(json["ok"], true);
        assert_eq!(json["message"], "Clinica is alive");
    }
}
