//! Commands and function types

use serde::{Deserialize, Serialize};
use std::fmt;

use super::diagnosis::{DeviceDiagnosisStateData, HeartbeatData};

/// Function (data class) a command operates on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FunctionType {
    DeviceDiagnosisStateData,
    DeviceDiagnosisHeartbeatData,
}

impl FunctionType {
    /// Wire name of the function
    pub fn as_str(&self) -> &'static str {
        match self {
            FunctionType::DeviceDiagnosisStateData => "deviceDiagnosisStateData",
            FunctionType::DeviceDiagnosisHeartbeatData => "deviceDiagnosisHeartbeatData",
        }
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Command payload of a datagram, tagged by its function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Cmd {
    DeviceDiagnosisHeartbeatData(HeartbeatData),
    DeviceDiagnosisStateData(DeviceDiagnosisStateData),
}

impl Cmd {
    /// Function this command carries data for
    pub fn function(&self) -> FunctionType {
        match self {
            Cmd::DeviceDiagnosisHeartbeatData(_) => FunctionType::DeviceDiagnosisHeartbeatData,
            Cmd::DeviceDiagnosisStateData(_) => FunctionType::DeviceDiagnosisStateData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_display_matches_serde() {
        for function in [
            FunctionType::DeviceDiagnosisStateData,
            FunctionType::DeviceDiagnosisHeartbeatData,
        ] {
            let json = serde_json::to_string(&function).unwrap();
            assert_eq!(json, format!("\"{}\"", function));
        }
    }

    #[test]
    fn test_cmd_is_tagged_by_function() {
        let cmd = Cmd::DeviceDiagnosisHeartbeatData(HeartbeatData {
            heartbeat_counter: Some(3),
            ..Default::default()
        });
        assert_eq!(cmd.function(), FunctionType::DeviceDiagnosisHeartbeatData);

        let value = serde_json::to_value(&cmd).unwrap();
        assert_eq!(value["deviceDiagnosisHeartbeatData"]["heartbeatCounter"], 3);
    }
}
