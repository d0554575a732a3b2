//! The two forms that ship with formcast.

use super::{
    AppDefinition, Comparison, DerivedRule, Highlight, Insight, NumberDefault, OptionSource,
    Task, Widget, WidgetSection,
};
use crate::schema::{CategoryNormalization, FieldSpec, Schema};
use crate::stats::Brackets;

/// Names accepted by [`builtin`].
pub const BUILTIN_APPS: &[&str] = &["airline", "diamonds"];

/// Built-in definition by name.
#[must_use]
pub fn builtin(name: &str) -> Option<AppDefinition> {
    match name.trim().to_ascii_lowercase().as_str() {
        "airline" => Some(airline()),
        "diamonds" | "diamond" => Some(diamonds()),
        _ => None,
    }
}

pub(super) const AIRLINE_RATINGS: &[(&str, &str)] = &[
    ("seat_comfort", "Seat comfort (1–5 stars)"),
    ("food_and_drink", "Food and drink service (1–5 stars)"),
    ("gate_location", "Rate the gate location (1–5 stars)"),
    ("inflight_wifi_service", "Inflight WiFi service (1–5 stars)"),
    ("inflight_entertainment", "Inflight entertainment (1–5 stars)"),
    ("online_support", "Online support (1–5 stars)"),
    ("ease_of_online_booking", "Ease of online booking (1–5 stars)"),
    ("on-board_service", "On-board service (1–5 stars)"),
    ("leg_room_service", "Leg room comfort (1–5 stars)"),
    ("baggage_handling", "Baggage handling efficiency (1–5 stars)"),
    ("checkin_service", "Check-in service (1–5 stars)"),
    ("cleanliness", "Aircraft cleanliness (1–5 stars)"),
    ("online_boarding", "Online boarding (1–5 stars)"),
    (
        "departure_arrival_time_convenient",
        "Departure/arrival time convenience (1–5 stars)",
    ),
];

fn select(field: &str, label: &str, options: OptionSource) -> Widget {
    Widget::Select {
        field: field.to_string(),
        label: label.to_string(),
        options,
    }
}

fn number(field: &str, label: &str, step: f64, integer: bool, default: NumberDefault) -> Widget {
    Widget::Number {
        field: field.to_string(),
        label: label.to_string(),
        step,
        integer,
        default,
    }
}

fn highlight(title: &str, text: &str) -> Highlight {
    Highlight {
        title: title.to_string(),
        text: text.to_string(),
    }
}

fn insight(title: &str, image: &str, caption: &str) -> Insight {
    Insight {
        title: title.to_string(),
        image: image.into(),
        caption: caption.to_string(),
    }
}

fn fixed(options: &[&str]) -> OptionSource {
    OptionSource::Fixed(options.iter().map(|s| s.to_string()).collect())
}

/// Airline customer-satisfaction survey backed by a decision tree.
#[must_use]
pub fn airline() -> AppDefinition {
    let mut fields = vec![
        FieldSpec::categorical("customer_type"),
        FieldSpec::categorical("type_of_travel"),
        FieldSpec::categorical("class"),
    ];
    fields.extend(
        [
            "age",
            "flight_distance",
            "departure_delay_in_minutes",
            "arrival_delay_in_minutes",
        ]
        .into_iter()
        .map(FieldSpec::numeric),
    );
    fields.extend(AIRLINE_RATINGS.iter().map(|(f, _)| FieldSpec::numeric(*f)));

    let int = |field: &str, label: &str| number(field, label, 1.0, true, NumberDefault::Min);

    AppDefinition {
        id: "airline".to_string(),
        title: "Airline Customer Satisfaction".to_string(),
        tagline: "Gain insights into passenger experiences and improve satisfaction through data analysis and surveys.".to_string(),
        target_label: "Satisfaction".to_string(),
        value_prefix: String::new(),
        schema: Schema::new(fields, "satisfaction"),
        task: Task::Classification {
            positive_class: Some("satisfied".to_string()),
        },
        sections: vec![
            WidgetSection {
                title: "Part 1: Customer Details".to_string(),
                description: "Provide information about the customer flying".to_string(),
                widgets: vec![
                    select("customer_type", "What type of customer is this?", OptionSource::Reference),
                    select(
                        "type_of_travel",
                        "Is the customer travelling for business or personal reasons?",
                        OptionSource::Reference,
                    ),
                    select("class", "In which class will the customer be flying?", OptionSource::Reference),
                    int("age", "How old is the customer?"),
                ],
            },
            WidgetSection {
                title: "Part 2: Flight Details".to_string(),
                description: "Provide details about the customer's flight".to_string(),
                widgets: vec![
                    int("flight_distance", "How far is the customer flying in miles?"),
                    int(
                        "departure_delay_in_minutes",
                        "How many minutes was the customer's departure delayed? (Enter 0 if not delayed)",
                    ),
                    int(
                        "arrival_delay_in_minutes",
                        "How many minutes was the customer's arrival delayed? (Enter 0 if not delayed)",
                    ),
                ],
            },
            WidgetSection {
                title: "Part 3: Customer Experience Details".to_string(),
                description: "Provide details about the customer's flight experience and satisfaction"
                    .to_string(),
                widgets: AIRLINE_RATINGS
                    .iter()
                    .map(|(field, label)| Widget::Rating {
                        field: (*field).to_string(),
                        label: (*label).to_string(),
                    })
                    .collect(),
            },
        ],
        comparisons: vec![
            Comparison::CategoryShare {
                title: "Customer Type Comparison".to_string(),
                field: "customer_type".to_string(),
            },
            Comparison::CategoryShare {
                title: "Type of Travel Comparison".to_string(),
                field: "type_of_travel".to_string(),
            },
            Comparison::CategoryShare {
                title: "Flight Class Comparison".to_string(),
                field: "class".to_string(),
            },
            Comparison::Bracket {
                title: "Age Group Comparison".to_string(),
                field: "age".to_string(),
                brackets: Brackets::age(),
            },
        ],
        facts: Vec::new(),
        highlights: vec![
            highlight(
                "Fill out a Survey",
                "Provide a form for users to fill out their airline satisfaction feedback.",
            ),
            highlight(
                "Make Data-Driven Decisions",
                "Use insights to guide improvements in customer experience.",
            ),
            highlight(
                "Interactive Features",
                "Explore data with fully interactive charts and summaries!",
            ),
        ],
        insights: Vec::new(),
    }
}

const DIAMOND_FACTS: &[&str] = &[
    "The largest diamond ever discovered is the Cullinan Diamond, weighing over 3,100 carats!",
    "Diamonds are made of pure carbon, the same element found in graphite pencils!",
    "Natural diamonds can form more than 100 miles beneath Earth's surface under extreme heat and pressure.",
    "Only about 20% of mined diamonds are suitable for jewelry; the rest are used for industrial purposes.",
    "The word 'diamond' comes from the Greek word 'adamas', meaning 'unbreakable' or 'invincible'.",
    "Lab-grown diamonds have the same physical, chemical, and optical properties as natural ones!",
    "The price of a diamond increases exponentially with its carat weight, not linearly!",
    "Most diamonds are between 1 and 3 billion years old, older than most continents!",
    "The rarest diamond color is red; only a handful have ever been found.",
    "Diamond is the hardest known natural material on Earth: it ranks 10 on the Mohs hardness scale.",
];

/// Diamond price regression with split-conformal intervals.
#[must_use]
pub fn diamonds() -> AppDefinition {
    let schema = Schema::new(
        vec![
            FieldSpec::numeric("carat"),
            FieldSpec::categorical("cut"),
            FieldSpec::categorical("color"),
            FieldSpec::categorical("clarity"),
            FieldSpec::numeric("depth"),
            FieldSpec::numeric("table"),
            FieldSpec::numeric("x"),
            FieldSpec::numeric("y"),
            FieldSpec::numeric("z"),
        ],
        "price",
    )
    .with_normalization(CategoryNormalization::Trim);

    let mm = |field: &str, label: &str| number(field, label, 0.01, false, NumberDefault::Min);

    AppDefinition {
        id: "diamonds".to_string(),
        title: "Diamond Price Prediction".to_string(),
        tagline: "This app uses multiple inputs to predict the price of a diamond".to_string(),
        target_label: "Price".to_string(),
        value_prefix: "$".to_string(),
        schema,
        task: Task::IntervalRegression {
            alpha_min: 0.01,
            alpha_max: 0.30,
            alpha_default: 0.10,
            alpha_step: 0.01,
        },
        sections: vec![WidgetSection {
            title: "Diamond Features Input".to_string(),
            description: "Enter diamond features below".to_string(),
            widgets: vec![
                number("carat", "Carat Weight", 0.01, false, NumberDefault::Min),
                select("cut", "Cut", fixed(&["Fair", "Good", "Very Good", "Premium", "Ideal"])),
                select("color", "Color", fixed(&["J", "I", "H", "G", "F", "E", "D"])),
                select(
                    "clarity",
                    "Clarity",
                    fixed(&["I1", "SI2", "SI1", "VS2", "VS1", "VVS2", "VVS1", "IF"]),
                ),
                mm("x", "Length (x in mm)"),
                mm("y", "Width (y in mm)"),
                mm("z", "Depth (z in mm)"),
                Widget::Derived {
                    field: "depth".to_string(),
                    rule: DerivedRule::diamond_depth(),
                },
                number("table", "Table (%)", 0.1, false, NumberDefault::Mean),
            ],
        }],
        comparisons: Vec::new(),
        facts: DIAMOND_FACTS.iter().map(|s| s.to_string()).collect(),
        highlights: Vec::new(),
        insights: vec![
            insight(
                "Feature Importance",
                "feature_imp.svg",
                "Features used in this prediction are ranked by relative importance.",
            ),
            insight(
                "Histogram of Residuals",
                "residuals_dist.svg",
                "Distribution of residuals to evaluate prediction quality.",
            ),
            insight(
                "Predicted vs. Actual",
                "pred_vs_act.svg",
                "Visual comparison of predicted and actual values.",
            ),
            insight(
                "Coverage Plot",
                "coverage_plot.svg",
                "Range of predictions with confidence intervals.",
            ),
        ],
    }
}
