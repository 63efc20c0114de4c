/// Errors produced by change-set computation.
///
/// Backend call failures are not represented here; they surface as
/// `anyhow::Error` from the [`crate::AlarmBackend`] implementation with the
/// failing alarm name attached as context.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Two distinct required specs derived the same alarm name. Treated as a
    /// configuration error: applying either would silently overwrite the
    /// other, so reconciliation aborts before any backend call.
    #[error(
        "duplicate derived alarm name `{alarm_name}` (resources `{first_resource}` and `{second_resource}`)"
    )]
    DuplicateAlarmName {
        alarm_name: String,
        first_resource: String,
        second_resource: String,
    },
}
