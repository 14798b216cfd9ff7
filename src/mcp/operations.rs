//! TestRail operation table.
//!
//! One entry per exposed endpoint. TestRail routes every write, including
//! deletes and closes, through POST.

use super::tools::{OperationDescriptor, ParamKind, ParamSpec};
use crate::integrations::HttpMethod;

const PROJECT_ID: ParamSpec = ParamSpec::id("project_id", "The ID of the project");
const CASE_ID: ParamSpec = ParamSpec::id("case_id", "The ID of the test case");
const RUN_ID: ParamSpec = ParamSpec::id("run_id", "The ID of the test run");
const TEST_ID: ParamSpec = ParamSpec::id("test_id", "The ID of the test");
const DATASET_ID: ParamSpec = ParamSpec::id("dataset_id", "The ID of the dataset");

const CASE_FIELDS: [ParamSpec; 5] = [
    ParamSpec::optional("type_id", ParamKind::Integer, "The ID of the case type"),
    ParamSpec::optional("priority_id", ParamKind::Integer, "The ID of the priority"),
    ParamSpec::optional("estimate", ParamKind::String, "The estimate, e.g. '30s' or '1m 45s'"),
    ParamSpec::optional("milestone_id", ParamKind::Integer, "The ID of the milestone"),
    ParamSpec::optional("refs", ParamKind::String, "A comma-separated list of references"),
];

const RUN_FIELDS: [ParamSpec; 5] = [
    ParamSpec::optional("description", ParamKind::String, "The description of the test run"),
    ParamSpec::optional("milestone_id", ParamKind::Integer, "The ID of the milestone"),
    ParamSpec::optional(
        "assignedto_id",
        ParamKind::Integer,
        "The ID of the user the test run should be assigned to",
    ),
    ParamSpec::optional(
        "include_all",
        ParamKind::Boolean,
        "True to include all test cases of the suite, false for a custom case selection",
    ),
    ParamSpec::optional(
        "case_ids",
        ParamKind::IntegerList,
        "An array of case IDs for the custom case selection",
    ),
];

const BULK_RESULTS: ParamSpec = ParamSpec::required(
    "results",
    ParamKind::ObjectList,
    "Result objects, each with the same fields as add_result plus its test or case ID",
);

/// Every operation exposed as a tool, in registration order.
pub static OPERATIONS: &[OperationDescriptor] = &[
    // Projects
    OperationDescriptor {
        name: "get_project",
        description: "Get a project by ID",
        method: HttpMethod::Get,
        endpoint: "get_project/{project_id}",
        params: &[PROJECT_ID],
    },
    OperationDescriptor {
        name: "get_projects",
        description: "Get all projects",
        method: HttpMethod::Get,
        endpoint: "get_projects",
        params: &[],
    },
    OperationDescriptor {
        name: "add_project",
        description: "Add a new project",
        method: HttpMethod::Post,
        endpoint: "add_project",
        params: &[
            ParamSpec::required("name", ParamKind::String, "The name of the project"),
            ParamSpec::optional("announcement", ParamKind::String, "The announcement of the project"),
            ParamSpec::optional(
                "show_announcement",
                ParamKind::Boolean,
                "Whether to show the announcement",
            ),
            ParamSpec::optional(
                "suite_mode",
                ParamKind::Integer,
                "1 for single suite mode, 2 for single suite + baselines, 3 for multiple suites",
            ),
        ],
    },
    OperationDescriptor {
        name: "update_project",
        description: "Update an existing project",
        method: HttpMethod::Post,
        endpoint: "update_project/{project_id}",
        params: &[
            PROJECT_ID,
            ParamSpec::optional("name", ParamKind::String, "The name of the project"),
            ParamSpec::optional("announcement", ParamKind::String, "The announcement of the project"),
            ParamSpec::optional(
                "show_announcement",
                ParamKind::Boolean,
                "Whether to show the announcement",
            ),
            ParamSpec::optional("is_completed", ParamKind::Boolean, "Whether the project is completed"),
        ],
    },
    OperationDescriptor {
        name: "delete_project",
        description: "Delete a project",
        method: HttpMethod::Post,
        endpoint: "delete_project/{project_id}",
        params: &[PROJECT_ID],
    },
    // Cases
    OperationDescriptor {
        name: "get_case",
        description: "Get a test case by ID",
        method: HttpMethod::Get,
        endpoint: "get_case/{case_id}",
        params: &[CASE_ID],
    },
    OperationDescriptor {
        name: "get_cases",
        description: "Get all test cases for a project/suite",
        method: HttpMethod::Get,
        endpoint: "get_cases/{project_id}",
        params: &[
            PROJECT_ID,
            ParamSpec::filter("suite_id", ParamKind::Integer, "The ID of the test suite"),
        ],
    },
    OperationDescriptor {
        name: "add_case",
        description: "Add a new test case",
        method: HttpMethod::Post,
        endpoint: "add_case/{section_id}",
        params: &[
            ParamSpec::id("section_id", "The ID of the section"),
            ParamSpec::required("title", ParamKind::String, "The title of the test case"),
            CASE_FIELDS[0],
            CASE_FIELDS[1],
            CASE_FIELDS[2],
            CASE_FIELDS[3],
            CASE_FIELDS[4],
        ],
    },
    OperationDescriptor {
        name: "update_case",
        description: "Update an existing test case",
        method: HttpMethod::Post,
        endpoint: "update_case/{case_id}",
        params: &[
            CASE_ID,
            ParamSpec::optional("title", ParamKind::String, "The title of the test case"),
            CASE_FIELDS[0],
            CASE_FIELDS[1],
            CASE_FIELDS[2],
            CASE_FIELDS[3],
            CASE_FIELDS[4],
        ],
    },
    OperationDescriptor {
        name: "delete_case",
        description: "Delete a test case",
        method: HttpMethod::Post,
        endpoint: "delete_case/{case_id}",
        params: &[CASE_ID],
    },
    // Runs
    OperationDescriptor {
        name: "get_run",
        description: "Get a test run by ID",
        method: HttpMethod::Get,
        endpoint: "get_run/{run_id}",
        params: &[RUN_ID],
    },
    OperationDescriptor {
        name: "get_runs",
        description: "Get all test runs for a project",
        method: HttpMethod::Get,
        endpoint: "get_runs/{project_id}",
        params: &[PROJECT_ID],
    },
    OperationDescriptor {
        name: "add_run",
        description: "Add a new test run",
        method: HttpMethod::Post,
        endpoint: "add_run/{project_id}",
        params: &[
            PROJECT_ID,
            ParamSpec::required("suite_id", ParamKind::Integer, "The ID of the test suite"),
            ParamSpec::required("name", ParamKind::String, "The name of the test run"),
            RUN_FIELDS[0],
            RUN_FIELDS[1],
            RUN_FIELDS[2],
            RUN_FIELDS[3],
            RUN_FIELDS[4],
        ],
    },
    OperationDescriptor {
        name: "update_run",
        description: "Update an existing test run",
        method: HttpMethod::Post,
        endpoint: "update_run/{run_id}",
        params: &[
            RUN_ID,
            ParamSpec::optional("name", ParamKind::String, "The name of the test run"),
            RUN_FIELDS[0],
            RUN_FIELDS[1],
            RUN_FIELDS[2],
            RUN_FIELDS[3],
            RUN_FIELDS[4],
        ],
    },
    OperationDescriptor {
        name: "close_run",
        description: "Close an existing test run",
        method: HttpMethod::Post,
        endpoint: "close_run/{run_id}",
        params: &[RUN_ID],
    },
    OperationDescriptor {
        name: "delete_run",
        description: "Delete a test run",
        method: HttpMethod::Post,
        endpoint: "delete_run/{run_id}",
        params: &[RUN_ID],
    },
    // Results
    OperationDescriptor {
        name: "get_results",
        description: "Get all test results for a test",
        method: HttpMethod::Get,
        endpoint: "get_results/{test_id}",
        params: &[TEST_ID],
    },
    OperationDescriptor {
        name: "get_results_for_run",
        description: "Get all test results for a test run",
        method: HttpMethod::Get,
        endpoint: "get_results_for_run/{run_id}",
        params: &[RUN_ID],
    },
    OperationDescriptor {
        name: "add_result",
        description: "Add a new test result",
        method: HttpMethod::Post,
        endpoint: "add_result/{test_id}",
        params: &[
            TEST_ID,
            ParamSpec::required("status_id", ParamKind::Integer, "The ID of the test status"),
            ParamSpec::optional(
                "comment",
                ParamKind::String,
                "The comment / description for the test result",
            ),
            ParamSpec::optional(
                "version",
                ParamKind::String,
                "The version or build you tested against",
            ),
            ParamSpec::optional(
                "elapsed",
                ParamKind::String,
                "The time it took to execute the test, e.g. '30s' or '1m 45s'",
            ),
            ParamSpec::optional(
                "defects",
                ParamKind::String,
                "A comma-separated list of defects to link to the test result",
            ),
            ParamSpec::optional(
                "assignedto_id",
                ParamKind::Integer,
                "The ID of a user the test should be assigned to",
            ),
        ],
    },
    OperationDescriptor {
        name: "add_results",
        description: "Add multiple test results to a run, keyed by test ID",
        method: HttpMethod::Post,
        endpoint: "add_results/{run_id}",
        params: &[RUN_ID, BULK_RESULTS],
    },
    OperationDescriptor {
        name: "add_results_for_cases",
        description: "Add multiple test results to a run, keyed by case ID",
        method: HttpMethod::Post,
        endpoint: "add_results_for_cases/{run_id}",
        params: &[RUN_ID, BULK_RESULTS],
    },
    // Datasets
    OperationDescriptor {
        name: "get_dataset",
        description: "Get a dataset by ID",
        method: HttpMethod::Get,
        endpoint: "get_dataset/{dataset_id}",
        params: &[DATASET_ID],
    },
    OperationDescriptor {
        name: "get_datasets",
        description: "Get all datasets for a project",
        method: HttpMethod::Get,
        endpoint: "get_datasets/{project_id}",
        params: &[PROJECT_ID],
    },
    OperationDescriptor {
        name: "add_dataset",
        description: "Add a new dataset",
        method: HttpMethod::Post,
        endpoint: "add_dataset/{project_id}",
        params: &[
            PROJECT_ID,
            ParamSpec::required("name", ParamKind::String, "The name of the dataset"),
            ParamSpec::optional("description", ParamKind::String, "The description of the dataset"),
        ],
    },
    OperationDescriptor {
        name: "update_dataset",
        description: "Update an existing dataset",
        method: HttpMethod::Post,
        endpoint: "update_dataset/{dataset_id}",
        params: &[
            DATASET_ID,
            ParamSpec::optional("name", ParamKind::String, "The name of the dataset"),
            ParamSpec::optional("description", ParamKind::String, "The description of the dataset"),
        ],
    },
    OperationDescriptor {
        name: "delete_dataset",
        description: "Delete a dataset",
        method: HttpMethod::Post,
        endpoint: "delete_dataset/{dataset_id}",
        params: &[DATASET_ID],
    },
];
