//! Read-only lookup tables used by the aggregator.

use anyhow::{Context, Result};
use regex::Regex;

/// Estimator class names mapped to the label used in reports.
const MODEL_LABELS: &[(&str, &str)] = &[
    ("LogisticRegression", "Logistic Regression"),
    ("LinearRegression", "Linear Regression"),
    ("Ridge", "Ridge Regression"),
    ("Lasso", "Lasso Regression"),
    ("DecisionTreeClassifier", "Decision Tree"),
    ("DecisionTreeRegressor", "Decision Tree Regressor"),
    ("RandomForestClassifier", "Random Forest"),
    ("RandomForestRegressor", "Random Forest Regressor"),
    ("ExtraTreesClassifier", "Extra Trees"),
    ("GradientBoostingClassifier", "Gradient Boosting"),
    ("GradientBoostingRegressor", "Gradient Boosting Regressor"),
    ("AdaBoostClassifier", "AdaBoost"),
    ("XGBClassifier", "XGBoost"),
    ("XGBRegressor", "XGBoost Regressor"),
    ("LGBMClassifier", "LightGBM"),
    ("CatBoostClassifier", "CatBoost"),
    ("SVC", "Support Vector Machine"),
    ("LinearSVC", "Linear Support Vector Machine"),
    ("KNeighborsClassifier", "k-Nearest Neighbors"),
    ("GaussianNB", "Naive Bayes"),
    ("MLPClassifier", "Multilayer Perceptron"),
    ("KMeans", "K-Means Clustering"),
    ("Sequential", "Neural Network"),
];

const PREPROCESSING_STEPS: &[(&str, &str)] = &[
    ("drop_duplicates", "Removed duplicate records"),
    ("dropna", "Dropped rows with missing values"),
    ("fillna", "Imputed missing values"),
    ("SimpleImputer", "Imputed missing values with SimpleImputer"),
    ("rename", "Renamed columns for readability"),
    ("get_dummies", "One-hot encoded categorical variables"),
    ("OneHotEncoder", "One-hot encoded categorical variables with OneHotEncoder"),
    ("LabelEncoder", "Label-encoded categorical variables"),
    ("StandardScaler", "Standardized numeric features with StandardScaler"),
    ("MinMaxScaler", "Scaled numeric features to a fixed range with MinMaxScaler"),
    ("PCA", "Reduced dimensionality with PCA"),
    ("SMOTE", "Balanced the classes with SMOTE oversampling"),
    ("train_test_split", "Split the data into training and test sets"),
];

const TUNING_MARKERS: &[&str] = &["GridSearchCV", "RandomizedSearchCV", "BayesSearchCV", "optuna"];

const LIBRARY_ALIASES: &[(&str, &str)] = &[
    ("sklearn", "scikit-learn"),
    ("pd", "pandas"),
    ("np", "numpy"),
    ("plt", "matplotlib"),
    ("sns", "seaborn"),
    ("torch", "pytorch"),
];

const EXCLUDED_LIBRARIES: &[&str] = &[
    "warnings",
    "os",
    "sys",
    "json",
    "csv",
    "re",
    "time",
    "datetime",
    "collections",
];

#[derive(Debug, Clone, Copy)]
pub struct LibraryCitation {
    pub library: &'static str,
    pub authors: &'static str,
    pub title: &'static str,
    pub year: &'static str,
    pub journal: Option<&'static str>,
    pub volume: Option<&'static str>,
    pub pages: Option<&'static str>,
    pub url: Option<&'static str>,
}

impl LibraryCitation {
    pub fn reference(&self) -> String {
        let mut citation = format!("{} ({}). {}.", self.authors, self.year, self.title);

        if let Some(journal) = self.journal {
            citation.push(' ');
            citation.push_str(journal);
            if let Some(volume) = self.volume {
                citation.push_str(", ");
                citation.push_str(volume);
            }
            if let Some(pages) = self.pages {
                citation.push_str(", ");
                citation.push_str(pages);
            }
            citation.push('.');
        }

        if let Some(url) = self.url {
            citation.push_str(" Retrieved from ");
            citation.push_str(url);
        }

        citation
    }
}

const LIBRARY_CITATIONS: &[LibraryCitation] = &[
    LibraryCitation {
        library: "pandas",
        authors: "The pandas development team",
        title: "pandas-dev/pandas: Powerful data structures for data analysis, time series, and statistics",
        year: "2023",
        journal: None,
        volume: None,
        pages: None,
        url: Some("https://github.com/pandas-dev/pandas"),
    },
    LibraryCitation {
        library: "numpy",
        authors: "Harris, C. R., Millman, K. J., van der Walt, S. J., et al.",
        title: "Array programming with NumPy",
        year: "2020",
        journal: Some("Nature"),
        volume: Some("585"),
        pages: Some("357-362"),
        url: None,
    },
    LibraryCitation {
        library: "matplotlib",
        authors: "Hunter, J. D.",
        title: "Matplotlib: A 2D graphics environment",
        year: "2007",
        journal: Some("Computing in Science & Engineering"),
        volume: Some("9"),
        pages: Some("90-95"),
        url: None,
    },
    LibraryCitation {
        library: "seaborn",
        authors: "Waskom, M. L.",
        title: "seaborn: statistical data visualization",
        year: "2021",
        journal: Some("Journal of Open Source Software"),
        volume: Some("6"),
        pages: Some("3021"),
        url: None,
    },
    LibraryCitation {
        library: "scikit-learn",
        authors: "Pedregosa, F., Varoquaux, G., Gramfort, A., et al.",
        title: "Scikit-learn: Machine Learning in Python",
        year: "2011",
        journal: Some("Journal of Machine Learning Research"),
        volume: Some("12"),
        pages: Some("2825-2830"),
        url: None,
    },
    LibraryCitation {
        library: "tensorflow",
        authors: "Abadi, M., Agarwal, A., Barham, P., et al.",
        title: "TensorFlow: Large-scale machine learning on heterogeneous systems",
        year: "2015",
        journal: None,
        volume: None,
        pages: None,
        url: Some("https://www.tensorflow.org/"),
    },
    LibraryCitation {
        library: "pytorch",
        authors: "Paszke, A., Gross, S., Massa, F., et al.",
        title: "PyTorch: An Imperative Style, High-Performance Deep Learning Library",
        year: "2019",
        journal: Some("Advances in Neural Information Processing Systems"),
        volume: Some("32"),
        pages: None,
        url: None,
    },
    LibraryCitation {
        library: "xgboost",
        authors: "Chen, T., & Guestrin, C.",
        title: "XGBoost: A Scalable Tree Boosting System",
        year: "2016",
        journal: Some("Proceedings of the 22nd ACM SIGKDD International Conference on Knowledge Discovery and Data Mining"),
        volume: None,
        pages: Some("785-794"),
        url: None,
    },
    LibraryCitation {
        library: "lightgbm",
        authors: "Ke, G., Meng, Q., Finley, T., et al.",
        title: "LightGBM: A Highly Efficient Gradient Boosting Decision Tree",
        year: "2017",
        journal: Some("Advances in Neural Information Processing Systems"),
        volume: Some("30"),
        pages: None,
        url: None,
    },
];

pub fn model_label(class_name: &str) -> Option<&'static str> {
    MODEL_LABELS
        .iter()
        .find(|(name, _)| *name == class_name)
        .map(|(_, label)| *label)
}

/// Compiled whole-identifier matchers for the code-side tables.
///
/// `SVC` does not match inside `LinearSVC`.
#[derive(Debug)]
pub struct CodeScanner {
    models: Vec<(Regex, &'static str)>,
    preprocessing: Vec<(Regex, &'static str)>,
    tuning: Vec<Regex>,
}

impl CodeScanner {
    pub fn new() -> Result<Self> {
        Ok(Self {
            models: labelled_patterns(MODEL_LABELS)?,
            preprocessing: labelled_patterns(PREPROCESSING_STEPS)?,
            tuning: TUNING_MARKERS
                .iter()
                .map(|marker| identifier_regex(marker))
                .collect::<Result<Vec<Regex>>>()?,
        })
    }

    /// Labels of every known estimator referenced in `code`, in table order.
    pub fn detect_models(&self, code: &str) -> Vec<&'static str> {
        let mut labels = Vec::<&'static str>::new();
        for (pattern, label) in &self.models {
            if pattern.is_match(code) && !labels.contains(label) {
                labels.push(label);
            }
        }
        labels
    }

    pub fn detect_preprocessing(&self, code: &str) -> Vec<&'static str> {
        self.preprocessing
            .iter()
            .filter(|(pattern, _)| pattern.is_match(code))
            .map(|(_, step)| *step)
            .collect()
    }

    pub fn detect_tuning(&self, code: &str) -> bool {
        self.tuning.iter().any(|pattern| pattern.is_match(code))
    }
}

fn labelled_patterns(table: &[(&str, &'static str)]) -> Result<Vec<(Regex, &'static str)>> {
    table
        .iter()
        .map(|(ident, label)| Ok((identifier_regex(ident)?, *label)))
        .collect()
}

fn identifier_regex(ident: &str) -> Result<Regex> {
    Regex::new(&format!(r"\b{}\b", regex::escape(ident)))
        .with_context(|| format!("failed to compile identifier regex for {ident}"))
}

/// Base library of an import statement, with aliases resolved.
///
/// Standard-library modules yield `None`.
pub fn canonical_library(import: &str) -> Option<String> {
    let import = import.trim();
    let base = if let Some(rest) = import.strip_prefix("from ") {
        rest.split_whitespace().next()?.split('.').next()?
    } else if let Some(rest) = import.strip_prefix("import ") {
        rest.split(',')
            .next()?
            .split(" as ")
            .next()?
            .trim()
            .split('.')
            .next()?
    } else {
        import.split('.').next()?
    };

    let base = base.trim();
    if base.is_empty() || EXCLUDED_LIBRARIES.contains(&base) {
        return None;
    }

    let canonical = LIBRARY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == base)
        .map(|(_, name)| *name)
        .unwrap_or(base);
    Some(canonical.to_string())
}

pub fn library_citation(library: &str) -> Option<&'static LibraryCitation> {
    let library = library.to_ascii_lowercase();
    LIBRARY_CITATIONS
        .iter()
        .find(|citation| citation.library == library)
}
