use crate::error::ParseError;
use crate::intent::Intent;
use crate::llm_client::{Tool, ToolCall, ToolFunction};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;

pub const FIND_FILES: &str = "find_files";
pub const ORGANIZE_FILES: &str = "organize_files";

/// Arguments of the `find_files` tool
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FindFilesArgs {
    pub file_extension: String,
    #[serde(default)]
    pub search_path: Option<String>,
}

/// Arguments of the `organize_files` tool
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrganizeFilesArgs {
    pub file_extension: String,
    #[serde(default)]
    pub source_path: Option<String>,
    pub target_folder_name: String,
}

/// The fixed instruction schema sent with every request.
pub fn file_tools() -> Vec<Tool> {
    vec![
        Tool {
            tool_type: "function".to_string(),
            function: ToolFunction {
                name: FIND_FILES.to_string(),
                description: "Find all files with a given extension in a directory and its subdirectories".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "file_extension": {"type": "string", "description": "Extension to look for, e.g. 'pdf'. Case insensitive, without the dot"},
                        "search_path": {"type": "string", "description": "Directory to search. Omit to use the base directory"}
                    },
                    "required": ["file_extension"]
                }),
            },
        },
        Tool {
            tool_type: "function".to_string(),
            function: ToolFunction {
                name: ORGANIZE_FILES.to_string(),
                description: "Move all files with a given extension from a source directory into a folder created inside that directory".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "file_extension": {"type": "string", "description": "Extension of the files to move, e.g. 'jpg'. Without the dot"},
                        "source_path": {"type": "string", "description": "Directory to collect files from. Omit to use the base directory"},
                        "target_folder_name": {"type": "string", "description": "Name of the folder to move the files into, created inside source_path"}
                    },
                    "required": ["file_extension", "target_folder_name"]
                }),
            },
        },
    ]
}

/// Turn one tool call into an intent, rejecting anything that does not fit the schema.
pub fn intent_from_tool_call(call: &ToolCall) -> Result<Intent, ParseError> {
    match call.function.name.as_str() {
        FIND_FILES => {
            let args: FindFilesArgs = parse_arguments(call)?;
            Intent::find_files(&args.file_extension, args.search_path.as_deref())
        }
        ORGANIZE_FILES => {
            let args: OrganizeFilesArgs = parse_arguments(call)?;
            Intent::organize_files(
                &args.file_extension,
                args.source_path.as_deref(),
                &args.target_folder_name,
            )
        }
        other => Err(ParseError::UnknownTool(other.to_string())),
    }
}

fn parse_arguments<T: DeserializeOwned>(call: &ToolCall) -> Result<T, ParseError> {
    // Some models send "" instead of "{}" for a call without arguments.
    let raw = match call.function.arguments.trim() {
        "" => "{}",
        raw => raw,
    };
    serde_json::from_str(raw).map_err(|source| ParseError::MalformedArguments {
        tool: call.function.name.clone(),
        source,
    })
}
