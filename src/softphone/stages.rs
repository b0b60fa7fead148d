//! Softphone stage selection and side effects.

use serde_json::{Value, json};
use tracing::debug;

use crate::error::{PlanError, Result};
use crate::inputs::{
    Payload, SoftphoneRow, StaticPolicy, payload_flag, payload_present, payload_str,
    payload_string, split_pipe,
};
use crate::planner::{ResolvedRefs, SoftphoneStage, org_id, set_always_forward};
use crate::webex::{LicenseAssignment, Setting, SettingTarget, WebexApi};

/// Stages that apply to a record: the license always, then every optional
/// stage whose trigger column is set.
#[must_use]
pub fn build_stages(record: &SoftphoneRow) -> Vec<SoftphoneStage> {
    let payload = &record.payload;
    let truthy = |key: &str| payload_flag(payload, key).unwrap_or(false);

    let mut stages = vec![SoftphoneStage::AssignCallingLicense];
    if payload_present(payload, "alternate_numbers") {
        stages.push(SoftphoneStage::ApplyNumbersUpdate);
    }
    if truthy("cf_always_enabled") {
        stages.push(SoftphoneStage::ApplyForwarding);
    }
    if truthy("voicemail_enabled") {
        stages.push(SoftphoneStage::ApplyVoicemail);
    }
    if truthy("intercept_enabled") {
        stages.push(SoftphoneStage::ApplyCallIntercept);
    }
    if payload_present(payload, "incoming_permissions_mode")
        || payload_present(payload, "outgoing_permissions_mode")
    {
        stages.push(SoftphoneStage::ApplyPermissions);
    }
    if payload_present(payload, "call_queue_names") {
        stages.push(SoftphoneStage::ApplyCallQueueMemberships);
    }
    stages
}

/// Applies one stage for one record and returns the API response, if any.
///
/// # Errors
///
/// Returns an error if the person, a queue or a policy entry cannot be
/// resolved, or if an API call fails.
pub async fn apply_stage(
    api: &dyn WebexApi,
    policy: &StaticPolicy,
    refs: &mut ResolvedRefs,
    stage: SoftphoneStage,
    record: &SoftphoneRow,
    payload: &mut Payload,
) -> Result<Value> {
    let org = org_id(payload);
    let org = org.as_deref();

    if stage == SoftphoneStage::AssignCallingLicense {
        let assignment = LicenseAssignment {
            email: record.user_email.clone(),
            license_id: payload_string(payload, "calling_license_id")
                .unwrap_or_else(|| record.calling_license_id.clone()),
            location_id: payload_string(payload, "location_id")
                .unwrap_or_else(|| record.location_id.clone()),
            extension: payload_string(payload, "extension"),
            phone_number: payload_string(payload, "phone_number"),
        };
        return api.assign_license(&assignment, org).await;
    }

    let person_id = match refs.person_id(api, payload).await? {
        Some(id) => id,
        None => {
            return Err(PlanError::Unresolved {
                kind: "person",
                reference: record.user_email.clone(),
            }
            .into());
        }
    };
    let target = SettingTarget::Person(person_id.clone());

    match stage {
        SoftphoneStage::AssignCallingLicense => Ok(Value::Null),
        SoftphoneStage::ApplyNumbersUpdate => {
            let body = numbers_body(payload);
            api.write_setting(&target, Setting::Numbers, &body, org).await?;
            Ok(body)
        }
        SoftphoneStage::ApplyForwarding => {
            let destination = payload_string(payload, "cf_always_destination")
                .ok_or_else(|| PlanError::missing("cf_always_destination"))?;
            let mut forwarding = api.read_setting(&target, Setting::Forwarding, org).await?;
            set_always_forward(&mut forwarding, &destination);
            api.write_setting(&target, Setting::Forwarding, &forwarding, org)
                .await?;
            Ok(forwarding)
        }
        SoftphoneStage::ApplyVoicemail => {
            let body = policy
                .extra
                .get("voicemail_defaults")
                .cloned()
                .unwrap_or_else(|| json!({"enabled": true}));
            api.write_setting(&target, Setting::Voicemail, &body, org).await?;
            Ok(body)
        }
        SoftphoneStage::ApplyCallIntercept => {
            let body = json!({"enabled": true});
            api.write_setting(&target, Setting::Intercept, &body, org).await?;
            Ok(body)
        }
        SoftphoneStage::ApplyPermissions => {
            let mut applied = serde_json::Map::new();
            if let Some(mode) = payload_str(payload, "incoming_permissions_mode") {
                let body = policy
                    .extra
                    .get("incoming_permissions")
                    .and_then(|modes| modes.get(mode))
                    .cloned()
                    .ok_or_else(|| PlanError::missing(format!("incoming_permissions.{mode}")))?;
                api.write_setting(&target, Setting::IncomingPermission, &body, org)
                    .await?;
                applied.insert(String::from("incoming"), body);
            }
            if let Some(mode) = payload_str(payload, "outgoing_permissions_mode") {
                let body = policy.outgoing_profiles.get(mode).cloned().ok_or_else(|| {
                    PlanError::OutgoingProfileNotFound {
                        profile: mode.to_string(),
                    }
                })?;
                api.write_setting(&target, Setting::OutgoingPermission, &body, org)
                    .await?;
                applied.insert(String::from("outgoing"), body);
            }
            Ok(Value::Object(applied))
        }
        SoftphoneStage::ApplyCallQueueMemberships => {
            let mut joined = Vec::new();
            for name in split_pipe(payload_str(payload, "call_queue_names")) {
                let queue = api.find_call_queue(&name, org).await?.ok_or_else(|| {
                    PlanError::Unresolved {
                        kind: "call queue",
                        reference: name.clone(),
                    }
                })?;
                let queue_target = SettingTarget::CallQueue {
                    location_id: queue.location_id.clone(),
                    queue_id: queue.id.clone(),
                };
                let current = api.read_setting(&queue_target, Setting::Queue, org).await?;
                let mut agents = current
                    .get("agents")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                let present = agents
                    .iter()
                    .any(|agent| agent.get("id").and_then(Value::as_str) == Some(person_id.as_str()));
                if present {
                    debug!("{} already in queue {name}", record.user_email);
                } else {
                    agents.push(json!({"id": person_id}));
                    api.write_setting(&queue_target, Setting::Queue, &json!({"agents": agents}), org)
                        .await?;
                }
                joined.push(json!({"queue_id": queue.id, "name": name}));
            }
            Ok(Value::Array(joined))
        }
    }
}

/// `alternate_numbers` is either a JSON document sent as is, or a `|`
/// separated list of direct numbers to add.
fn numbers_body(payload: &Payload) -> Value {
    if let Some(Value::Object(body)) = payload.get("alternate_numbers") {
        return Value::Object(body.clone());
    }
    let raw = payload_str(payload, "alternate_numbers");
    if let Some(parsed) = raw.and_then(|r| serde_json::from_str::<Value>(r).ok()) {
        if parsed.is_object() {
            return parsed;
        }
    }
    let numbers: Vec<Value> = split_pipe(raw)
        .into_iter()
        .map(|n| json!({"action": "ADD", "directNumber": n}))
        .collect();
    json!({"phoneNumbers": numbers})
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::{InputRecord, normalize_row};
    use crate::webex::testing::FakeWebex;

    fn record(extra: Value) -> SoftphoneRow {
        let mut payload = json!({
            "user_email": "user@example.com",
            "calling_license_id": "lic-1",
            "location_id": "loc-1",
            "extension": "1001"
        });
        if let (Some(base), Some(extra)) = (payload.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        SoftphoneRow::from_payload(normalize_row(payload.as_object().cloned().unwrap_or_default()))
    }

    #[test]
    fn test_minimal_record_only_assigns_license() {
        assert_eq!(build_stages(&record(json!({}))), vec![SoftphoneStage::AssignCallingLicense]);
    }

    #[test]
    fn test_all_triggers_in_fixed_order() {
        let stages = build_stages(&record(json!({
            "alternate_numbers": "{}",
            "cf_always_enabled": true,
            "voicemail_enabled": true,
            "intercept_enabled": true,
            "incoming_permissions_mode": "custom",
            "call_queue_names": "queue 1"
        })));
        assert_eq!(stages, SoftphoneStage::ALL.to_vec());
    }

    #[test]
    fn test_false_flags_do_not_trigger() {
        let stages = build_stages(&record(json!({"cf_always_enabled": "no", "voicemail_enabled": "false"})));
        assert_eq!(stages, vec![SoftphoneStage::AssignCallingLicense]);
    }

    #[test]
    fn test_numbers_body_forms() {
        let pipe = record(json!({"alternate_numbers": "+341|+342"}));
        assert_eq!(
            numbers_body(&pipe.payload)["phoneNumbers"][1],
            json!({"action": "ADD", "directNumber": "+342"})
        );
        let doc = record(json!({"alternate_numbers": "{\"enableDistinctiveRingPattern\": true}"}));
        assert_eq!(numbers_body(&doc.payload), json!({"enableDistinctiveRingPattern": true}));
    }

    #[tokio::test]
    async fn test_license_assignment() {
        let api = FakeWebex::default();
        let row = record(json!({}));
        let mut payload = row.payload.clone();
        apply_stage(
            &api,
            &StaticPolicy::default(),
            &mut ResolvedRefs::new(),
            SoftphoneStage::AssignCallingLicense,
            &row,
            &mut payload,
        )
        .await
        .expect("license");

        let licenses = api.licenses();
        assert_eq!(licenses[0].license_id, "lic-1");
        assert_eq!(licenses[0].extension.as_deref(), Some("1001"));
    }

    #[tokio::test]
    async fn test_queue_membership_is_idempotent() {
        let queue = SettingTarget::CallQueue {
            location_id: String::from("loc-1"),
            queue_id: String::from("Q1"),
        };
        let api = FakeWebex::default()
            .with_person("P1", "user@example.com")
            .with_queue("Q1", "queue 1", "loc-1")
            .with_setting(queue.clone(), Setting::Queue, json!({"agents": [{"id": "P0"}]}));
        let row = record(json!({"call_queue_names": "queue 1"}));
        let mut refs = ResolvedRefs::new();

        for _ in 0..2 {
            let mut payload = row.payload.clone();
            apply_stage(
                &api,
                &StaticPolicy::default(),
                &mut refs,
                SoftphoneStage::ApplyCallQueueMemberships,
                &row,
                &mut payload,
            )
            .await
            .expect("queue");
        }

        assert_eq!(api.writes().len(), 1);
        assert_eq!(
            api.setting(&queue, Setting::Queue),
            Some(json!({"agents": [{"id": "P0"}, {"id": "P1"}]}))
        );
    }

    #[tokio::test]
    async fn test_unknown_person_fails_later_stages() {
        let api = FakeWebex::default();
        let row = record(json!({"intercept_enabled": "yes"}));
        let mut payload = row.payload.clone();
        let err = apply_stage(
            &api,
            &StaticPolicy::default(),
            &mut ResolvedRefs::new(),
            SoftphoneStage::ApplyCallIntercept,
            &row,
            &mut payload,
        )
        .await
        .expect_err("no person");
        assert!(err.to_string().contains("person not found: user@example.com"));
    }

    #[tokio::test]
    async fn test_permissions_use_policy_modes() {
        let api = FakeWebex::default().with_person("P1", "user@example.com");
        let policy = StaticPolicy::parse(
            r#"{
                "outgoing_profiles": {"profile_1": {"useCustomEnabled": false}},
                "incoming_permissions": {"custom": {"useCustomEnabled": true}}
            }"#,
        )
        .expect("policy");
        let row = record(json!({
            "incoming_permissions_mode": "custom",
            "outgoing_permissions_mode": "profile_1"
        }));
        let mut payload = row.payload.clone();
        let applied = apply_stage(
            &api,
            &policy,
            &mut ResolvedRefs::new(),
            SoftphoneStage::ApplyPermissions,
            &row,
            &mut payload,
        )
        .await
        .expect("permissions");

        assert_eq!(applied["incoming"], json!({"useCustomEnabled": true}));
        let target = SettingTarget::Person(String::from("P1"));
        assert_eq!(
            api.setting(&target, Setting::OutgoingPermission),
            Some(json!({"useCustomEnabled": false}))
        );
    }
}
