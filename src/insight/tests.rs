use super::aggregate::ComplexityLevel;
use super::bullets::BulletParser;
use super::catalog::{CodeScanner, canonical_library, library_citation, model_label};
use super::evaluation::{EvaluationPatterns, MetricValue};
use super::outline::{build_outline, normalize_body};
use super::patterns::{NO_MISSING_VALUES_NOTE, PatternSet};
use super::*;
use crate::cli::ReportType;
use crate::notebook::{CellRecord, ErrorRecord, FunctionRecord, ParsedNotebook};

fn patterns() -> PatternSet {
    PatternSet::new().expect("patterns compile")
}

fn bullets() -> BulletParser {
    BulletParser::new().expect("list item regex compiles")
}

fn scanner() -> CodeScanner {
    CodeScanner::new().expect("identifier regexes compile")
}

fn evaluations(text: &str) -> Vec<super::evaluation::EvaluationRecord> {
    EvaluationPatterns::new()
        .expect("evaluation patterns compile")
        .parse(text)
}

fn cell(index: usize, source: &str) -> CellRecord {
    CellRecord {
        index,
        source: source.to_string(),
        execution_count: Some(index as u64),
    }
}

#[test]
fn outline_without_headings_is_a_single_context_section() {
    let sections = build_outline(&["First paragraph.\n\nSecond paragraph.", "Another cell."]);

    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].title, "Context");
    assert_eq!(sections[0].level, 2);
    assert_eq!(
        sections[0].content,
        "First paragraph.\n\nSecond paragraph.\n\nAnother cell."
    );
}

#[test]
fn outline_of_empty_input_is_an_empty_context_section() {
    let empty: [&str; 0] = [];
    let sections = build_outline(&empty);
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].title, "Context");
    assert!(sections[0].content.is_empty());

    let blank = build_outline(&["\n   \n"]);
    assert_eq!(blank.len(), 1);
    assert_eq!(blank[0].title, "Context");
}

#[test]
fn outline_splits_on_headings_and_keeps_levels() {
    let blocks = [
        "Intro before any heading.",
        "# Credit Default Prediction\nOverview text.",
        "## Dataset\n\n\n   - 30,000 clients   \n- 25 columns\n\n",
        "###\nOrphan body",
    ];
    let sections = build_outline(&blocks);

    let titles = sections
        .iter()
        .map(|section| (section.title.as_str(), section.level))
        .collect::<Vec<_>>();
    assert_eq!(
        titles,
        vec![
            ("Context", 2),
            ("Credit Default Prediction", 1),
            ("Dataset", 2),
            ("Untitled Section", 3),
        ]
    );
    assert_eq!(sections[2].content, "- 30,000 clients\n- 25 columns");
    assert_eq!(sections[3].content, "Orphan body");
}

#[test]
fn outline_preserves_paragraph_break_across_cells() {
    let sections = build_outline(&["## Notes\nfirst cell", "second cell"]);
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].content, "first cell\n\nsecond cell");
}

#[test]
fn normalize_body_collapses_blank_runs() {
    let lines = ["", "  a  ", "", "", "", "b", "", ""];
    assert_eq!(normalize_body(&lines), "a\n\nb");
}

#[test]
fn bullets_follow_marker_order_and_skip_plain_lines() {
    let body = "Intro line\n- first\n* second\n• third\n1. fourth\n2) fifth\n3.no-space\n-\n- ";
    let bullets = bullets().extract_bullets(body);

    assert_eq!(bullets, vec!["first", "second", "third", "fourth", "fifth"]);
    assert!(bullets.iter().all(|statement| !statement.is_empty()));
}

#[test]
fn statements_fall_back_to_non_blank_lines() {
    let body = "Predict credit default.\n\nUse client history.";
    assert_eq!(
        bullets().statements_or_lines(body),
        vec!["Predict credit default.", "Use client history."]
    );
    assert_eq!(
        bullets().statements_or_lines("- only bullet\nplain"),
        vec!["only bullet"]
    );
}

#[test]
fn dataset_shape_requires_two_digit_rows() {
    let patterns = patterns();
    assert_eq!(
        patterns.dataset_shape(&["Shape of data:", "(30000, 25)\n(10, 2)"]),
        Some((30000, 25))
    );
    assert_eq!(patterns.dataset_shape(&["(3, 2)"]), None);
    assert_eq!(patterns.dataset_shape::<&str>(&[]), None);
}

#[test]
fn feature_count_is_case_insensitive() {
    let patterns = patterns();
    let info = "<class 'pandas.core.frame.DataFrame'>\nData columns (Total 25 columns):";
    assert_eq!(patterns.feature_count(&[info]), Some(25));
    assert_eq!(patterns.feature_count(&["25 columns in total"]), None);
}

#[test]
fn missing_values_note_requires_target_and_zero_counts() {
    let patterns = patterns();
    let target = DEFAULT_TARGET_COLUMN;
    let clean = format!("ID    0\nLIMIT_BAL    0\nAGE    0\n{target}    0\ndtype: int64");
    let dirty = format!("ID    0\nAGE    12\n{target}    0\ndtype: int64");

    assert_eq!(
        patterns.missing_values_note(&[clean.as_str()], target),
        Some(NO_MISSING_VALUES_NOTE.to_string())
    );
    assert_eq!(patterns.missing_values_note(&[dirty.as_str()], target), None);
    assert_eq!(
        patterns.missing_values_note(&["ID 0\nAGE 0\ndtype: int64"], target),
        None
    );
}

#[test]
fn skewness_lists_every_name_under_the_cap() {
    let output = "LIMIT_BAL is highly skewed\nBILL_AMT1 is highly skewed\nPAY_AMT1 is highly skewed\nAGE is fine";
    let summary = patterns().skewness(&[output]).expect("skewness found");

    assert_eq!(summary.count, 3);
    assert!(summary.summary.contains("3 variables"));
    for name in ["LIMIT_BAL", "BILL_AMT1", "PAY_AMT1"] {
        assert!(summary.summary.contains(name));
    }
    assert!(!summary.summary.contains("..."));
}

#[test]
fn skewness_caps_displayed_names_at_five() {
    let output = (1..=7)
        .map(|index| format!("PAY_AMT{index} is Skewed to the right"))
        .collect::<Vec<String>>()
        .join("\n");
    let summary = patterns().skewness(&[output]).expect("skewness found");

    assert_eq!(summary.count, 7);
    assert!(summary.summary.contains("7 variables"));
    assert!(summary.summary.contains("PAY_AMT5, ..."));
    assert!(!summary.summary.contains("PAY_AMT6"));
    assert_eq!(patterns().skewness(&["nothing to see"]), None);
}

#[test]
fn correlation_groups_contributors_around_the_target() {
    let target = DEFAULT_TARGET_COLUMN;
    let block = format!(
        "{target}    1.000000\nPAY_0    0.324794\nPAY_2    0.263551\nPAY_3    0.235253\nPAY_4    0.216614\nPAY_5    0.204149\nAGE    0.013890\nLIMIT_BAL   -0.153520\nPAY_AMT1   -0.072929\nPAY_AMT2   -0.058579\nPAY_AMT3   -0.056250\nName: {target}, dtype: float64"
    );
    let summary = patterns()
        .correlation(&["unrelated".to_string(), block], target)
        .expect("correlation found");

    let positive = summary
        .positive
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(positive, vec!["PAY_0", "PAY_2", "PAY_3", "PAY_4"]);
    let negative = summary
        .negative
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(negative, vec!["LIMIT_BAL", "PAY_AMT1", "PAY_AMT2"]);

    assert_eq!(summary.sentences.len(), 2);
    assert!(summary.sentences[0].contains("PAY_0 (0.325)"));
    assert!(summary.sentences[1].contains("LIMIT_BAL (-0.154)"));
}

#[test]
fn correlation_needs_the_target_series_marker() {
    let target = DEFAULT_TARGET_COLUMN;
    assert_eq!(
        patterns().correlation(&["PAY_0    0.324794\nName: other, dtype: float64"], target),
        None
    );
}

#[test]
fn correlation_skips_class_counts_printed_for_the_target() {
    let target = DEFAULT_TARGET_COLUMN;
    let counts = format!("0    23364\n1     6636\nName: {target}, dtype: int64");
    let coefficients = format!(
        "{target}    1.000000\nPAY_0    0.324794\nLIMIT_BAL   -0.153520\nName: {target}, dtype: float64"
    );

    let summary = patterns()
        .correlation(&[counts.clone(), coefficients], target)
        .expect("correlation found");
    assert_eq!(summary.positive, vec![("PAY_0".to_string(), 0.324794)]);
    assert_eq!(summary.negative, vec![("LIMIT_BAL".to_string(), -0.15352)]);
    assert!(summary.sentences.iter().all(|sentence| !sentence.contains("23364")));

    assert_eq!(patterns().correlation(&[counts], target), None);
}

#[test]
fn first_url_trims_one_closing_parenthesis() {
    let patterns = patterns();
    let blocks = [
        "No link here.",
        "Source: [UCI](https://archive.ics.uci.edu/dataset/350))",
        "http://second.example",
    ];
    assert_eq!(
        patterns.first_url(&blocks),
        Some("https://archive.ics.uci.edu/dataset/350)".to_string())
    );
    assert_eq!(
        patterns.first_url(&["see (http://example.org)"]),
        Some("http://example.org".to_string())
    );
    assert_eq!(patterns.first_url(&["ftp://nope"]), None);
}

#[test]
fn evaluation_blocks_close_on_model_markers_and_matrix_rows() {
    let text = "Model: A\naccuracy 0.87 extra\n\nModel: B\nConfusion Matrix:\n[[50 10]\n [5 35]]";
    let records = evaluations(text);

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].name, "A");
    assert_eq!(records[0].number("accuracy"), Some(0.87));
    assert_eq!(records[1].name, "B");
    assert_eq!(
        records[1].metrics.get("confusion_matrix"),
        Some(&MetricValue::Matrix(vec![vec![50, 10], vec![5, 35]]))
    );
}

#[test]
fn evaluation_keeps_duplicate_model_names_separate() {
    let records = evaluations("Model: Logistic\naccuracy 0.80\nModel: Logistic\naccuracy 0.81");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].number("accuracy"), Some(0.80));
    assert_eq!(records[1].number("accuracy"), Some(0.81));
}

#[test]
fn accuracy_without_a_float_is_skipped() {
    let records = evaluations("Model: A\nAccuracy: not available\naccuracy n/a");
    assert_eq!(records.len(), 1);
    assert!(!records[0].metrics.contains_key("accuracy"));
}

#[test]
fn accuracy_falls_back_to_trailing_decimal_token() {
    let records = evaluations("Model: A\nAccuracy on test set = 0.8183 (n=6000)");
    assert_eq!(records[0].number("accuracy"), Some(0.8183));
}

#[test]
fn roc_auc_keeps_raw_text_when_unparseable() {
    let records = evaluations("Model: A\nROC AUC Score: 0.7712\nModel: B\nROC AUC Score: n/a");
    assert_eq!(records[0].number("roc_auc"), Some(0.7712));
    assert_eq!(
        records[1].metrics.get("roc_auc"),
        Some(&MetricValue::Raw("n/a".to_string()))
    );
}

#[test]
fn classification_report_rows_become_per_class_metrics() {
    let text = "Model: Random Forest\n              precision    recall  f1-score   support\n\n           0       0.84      0.95      0.89      4673\n           1       0.66      0.36      0.47      1327\n\n    accuracy                           0.82      6000\n   macro avg       0.75      0.65      0.68      6000";
    let records = evaluations(text);

    let record = &records[0];
    assert_eq!(record.number("precision_class_0"), Some(0.84));
    assert_eq!(record.number("recall_class_0"), Some(0.95));
    assert_eq!(record.number("f1_class_1"), Some(0.47));
    assert_eq!(record.number("accuracy"), Some(0.82));
    assert_eq!(record.metrics.len(), 7);
}

#[test]
fn confusion_matrix_attaches_on_blank_line_and_end_of_input() {
    let blank_closed = evaluations("Model: A\nConfusion Matrix\n[[4 1]\n\naccuracy 0.9");
    assert_eq!(
        blank_closed[0].metrics.get("confusion_matrix"),
        Some(&MetricValue::Matrix(vec![vec![4, 1]]))
    );
    assert_eq!(blank_closed[0].number("accuracy"), Some(0.9));

    let end_closed = evaluations("Model: A\nConfusion Matrix\n4 1\n2 3");
    assert_eq!(
        end_closed[0].metrics.get("confusion_matrix"),
        Some(&MetricValue::Matrix(vec![vec![4, 1], vec![2, 3]]))
    );
}

#[test]
fn confusion_outside_a_record_and_stray_lines_are_ignored() {
    let records = evaluations("Confusion Matrix\n[[1 2]\n [3 4]]\naccuracy 0.5");
    assert!(records.is_empty());
}

#[test]
fn catalog_resolves_libraries_models_and_steps() {
    assert_eq!(
        canonical_library("from sklearn.metrics import accuracy_score"),
        Some("scikit-learn".to_string())
    );
    assert_eq!(canonical_library("import pandas as pd"), Some("pandas".to_string()));
    assert_eq!(canonical_library("import os"), None);
    assert!(library_citation("NumPy").is_some());
    assert!(
        library_citation("numpy")
            .expect("numpy citation")
            .reference()
            .contains("Nature, 585, 357-362.")
    );

    assert_eq!(model_label("XGBClassifier"), Some("XGBoost"));
    let scanner = scanner();
    assert_eq!(scanner.detect_models("model = SVC()"), vec!["Support Vector Machine"]);
    assert_eq!(
        scanner.detect_models("model = LinearSVC()"),
        vec!["Linear Support Vector Machine"]
    );
    assert_eq!(
        scanner.detect_models("LogisticRegression(max_iter=200)\nRandomForestClassifier()"),
        vec!["Logistic Regression", "Random Forest"]
    );
    assert_eq!(
        scanner.detect_preprocessing("X_train, X_test = train_test_split(X)\nStandardScaler()"),
        vec![
            "Standardized numeric features with StandardScaler",
            "Split the data into training and test sets",
        ]
    );
}

#[test]
fn code_scanner_matches_whole_identifiers_only() {
    let scanner = scanner();
    assert!(scanner.detect_tuning("search = GridSearchCV(model, grid)"));
    assert!(!scanner.detect_tuning("MyGridSearchCVWrapper()"));
    assert!(scanner.detect_preprocessing("df.renamed_columns = cols").is_empty());
    assert_eq!(
        scanner.detect_preprocessing("df = df.rename(columns=names)"),
        vec!["Renamed columns for readability"]
    );
}

#[test]
fn complexity_thresholds() {
    assert_eq!(ComplexityLevel::assess(501, 0), ComplexityLevel::High);
    assert_eq!(ComplexityLevel::assess(10, 11), ComplexityLevel::High);
    assert_eq!(ComplexityLevel::assess(201, 0), ComplexityLevel::Medium);
    assert_eq!(ComplexityLevel::assess(10, 6), ComplexityLevel::Medium);
    assert_eq!(ComplexityLevel::assess(200, 5), ComplexityLevel::Low);
}

fn credit_notebook() -> ParsedNotebook {
    let target = DEFAULT_TARGET_COLUMN;
    let mut notebook = ParsedNotebook::default();

    notebook.markdown_cells = vec![
        cell(0, "# Credit Card Default Prediction\nThis project predicts default for credit card clients."),
        cell(1, "## Objectives\n- Identify drivers of default\n- Compare classifiers"),
        cell(2, "## Dataset\nData from [UCI](https://archive.ics.uci.edu/dataset/350)\n- 30,000 clients\n- 23 explanatory variables"),
        cell(3, "## Exploratory Data Analysis\n- Most clients are not in default"),
        cell(4, "## Data Preprocessing\n1. Renamed PAY_0 to PAY_1\n2. Scaled numeric features"),
        cell(5, "## Model Training\n- Logistic regression baseline\n- Random forest"),
        cell(6, "## Hyperparameter Tuning\n- Grid search over tree depth"),
    ];
    notebook.code_cells = vec![
        cell(7, "import pandas as pd\ndf = pd.read_csv('default.csv')"),
        cell(8, "from sklearn.model_selection import train_test_split, GridSearchCV\nX_train, X_test, y_train, y_test = train_test_split(X, y)"),
        cell(9, "def fit(model):\n    return model.fit(X_train, y_train)\nfit(LogisticRegression())\nfit(RandomForestClassifier())"),
    ];
    notebook.imports = vec![
        "from sklearn.model_selection import train_test_split, GridSearchCV".to_string(),
        "import pandas as pd".to_string(),
        "import warnings".to_string(),
    ];
    notebook.functions = vec![FunctionRecord {
        name: "fit".to_string(),
        definition: "def fit(model):".to_string(),
    }];
    notebook.outputs.text = vec![
        "(30000, 25)".to_string(),
        "Data columns (total 25 columns):".to_string(),
        format!("ID    0\nLIMIT_BAL    0\n{target}    0\ndtype: int64"),
        "LIMIT_BAL is highly skewed\nBILL_AMT1 is highly skewed".to_string(),
        format!("{target}    1.000000\nPAY_0    0.324794\nLIMIT_BAL   -0.153520\nName: {target}, dtype: float64"),
        "Model: LogisticRegression\naccuracy 0.78\n".to_string(),
        "Model: RandomForestClassifier\nAccuracy: 0.82\nConfusion Matrix:\n[[4400  273]\n [ 850  477]]".to_string(),
        "Best Parameters: {'max_depth': 8}\nBest Score: 0.8191".to_string(),
    ];
    notebook.outputs.plots = vec![serde_json::json!({"image/png": "..."}); 3];
    notebook.outputs.errors = vec![ErrorRecord::default()];

    notebook
}

#[test]
fn aggregator_assembles_the_full_context() {
    let extractor = InsightExtractor::new(ExtractOptions {
        report_type: ReportType::Research,
        ..ExtractOptions::default()
    })
    .expect("extractor builds");
    let context = extractor.extract(&credit_notebook());

    assert_eq!(context.project_info.title, "Credit Card Default Prediction");
    assert!(context.project_info.description.contains("predicts default"));
    assert_eq!(
        context.project_info.libraries_used,
        vec!["pandas".to_string(), "scikit-learn".to_string()]
    );
    assert_eq!(context.project_info.library_references.len(), 2);

    assert_eq!(
        context.objective_points,
        vec!["Identify drivers of default", "Compare classifiers"]
    );

    let dataset = &context.dataset_insights;
    assert_eq!(dataset.title, "Dataset");
    assert_eq!(dataset.shape, Some((30000, 25)));
    assert_eq!(dataset.feature_count, Some(25));
    assert_eq!(dataset.missing_values_note.as_deref(), Some(NO_MISSING_VALUES_NOTE));
    assert_eq!(
        dataset.source_url.as_deref(),
        Some("https://archive.ics.uci.edu/dataset/350")
    );
    assert_eq!(dataset.summary_points, vec!["30,000 clients", "23 explanatory variables"]);
    assert_eq!(
        context.data_analysis.estimated_dataset_size,
        "30000 rows x 25 columns"
    );
    assert_eq!(context.data_analysis.data_sources, vec!["CSV/Excel file"]);

    assert!(context.eda_insights[0].contains("2 variables"));
    assert!(context.eda_insights.iter().any(|insight| insight.contains("PAY_0 (0.325)")));
    assert!(
        context
            .eda_insights
            .iter()
            .any(|insight| insight == "Most clients are not in default")
    );

    assert_eq!(context.preprocessing_steps[0], "Renamed PAY_0 to PAY_1");
    assert!(
        context
            .preprocessing_steps
            .iter()
            .any(|step| step == "Split the data into training and test sets")
    );

    assert_eq!(
        context.modeling_details.models,
        vec!["Logistic Regression", "Random Forest"]
    );
    assert_eq!(
        context.modeling_details.notes,
        vec!["Logistic regression baseline", "Random forest"]
    );
    assert_eq!(
        context.modeling_details.best_model.as_deref(),
        Some("RandomForestClassifier (accuracy 0.820)")
    );

    assert_eq!(context.evaluation_metrics.len(), 2);
    assert_eq!(context.evaluation_metrics[0].number("accuracy"), Some(0.78));

    let tuning = &context.tuning_summary;
    assert!(tuning.performed);
    assert_eq!(tuning.notes, vec!["Grid search over tree depth"]);
    assert_eq!(tuning.best_params.as_deref(), Some("{'max_depth': 8}"));
    assert_eq!(tuning.best_score, Some(0.8191));

    assert_eq!(context.technical_analysis.total_code_lines, 8);
    assert_eq!(context.technical_analysis.function_count, 1);
    assert_eq!(context.complexity_level, ComplexityLevel::Low);
    assert_eq!(
        context.key_findings,
        vec![
            "Generated 3 visualizations",
            "Performance metrics calculated",
            "Encountered 1 errors during execution",
        ]
    );
    assert_eq!(context.report_type, ReportType::Research);
}

#[test]
fn aggregation_is_idempotent() {
    let extractor = InsightExtractor::new(ExtractOptions::default()).expect("extractor builds");
    let notebook = credit_notebook();

    assert_eq!(extractor.extract(&notebook), extractor.extract(&notebook));
}

#[test]
fn empty_notebook_yields_a_well_formed_context() {
    let extractor = InsightExtractor::new(ExtractOptions::default()).expect("extractor builds");
    let context = extractor.extract(&ParsedNotebook::default());

    assert_eq!(context.project_info.title, "Untitled Notebook");
    assert_eq!(context.section_outline.len(), 1);
    assert_eq!(context.dataset_insights.title, "Dataset");
    assert!(context.dataset_insights.shape.is_none());
    assert!(context.evaluation_metrics.is_empty());
    assert!(context.key_findings.is_empty());
    assert!(!context.tuning_summary.performed);
    assert_eq!(context.data_analysis.estimated_dataset_size, "Unknown");
    assert_eq!(context.complexity_level, ComplexityLevel::Low);
}

#[test]
fn context_serializes_with_stable_keys() {
    let extractor = InsightExtractor::new(ExtractOptions::default()).expect("extractor builds");
    let value = serde_json::to_value(extractor.extract(&credit_notebook()))
        .expect("context serializes");

    for key in [
        "project_info",
        "technical_analysis",
        "data_analysis",
        "results_summary",
        "section_outline",
        "objective_points",
        "dataset_insights",
        "eda_insights",
        "preprocessing_steps",
        "modeling_details",
        "evaluation_metrics",
        "tuning_summary",
        "complexity_level",
        "key_findings",
    ] {
        assert!(value.get(key).is_some(), "missing key {key}");
    }
    assert_eq!(value["complexity_level"], "Low");
    assert_eq!(value["report_type"], "academic");
    assert_eq!(value["evaluation_metrics"][1]["metrics"]["confusion_matrix"][1][0], 850);
}
