//! The single-customer prediction form.
//!
//! Fields are built from the deployed model's schema: a numeric field shows
//! up only when the schema has that column, and a categorical field offers
//! exactly the categories it was trained with.

use crate::domain::{FeatureInput, FeatureSchema};

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Number { value: f64, step: f64, min: f64, max: f64 },
    Choice { options: Vec<String>, selected: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    /// Schema field or column name.
    pub name: String,
    pub label: &'static str,
    pub kind: FieldKind,
}

impl FormField {
    pub fn display_value(&self) -> String {
        match &self.kind {
            FieldKind::Number { value, step, .. } if *step >= 1.0 => format!("{value:.0}"),
            FieldKind::Number { value, .. } => format!("{value:.2}"),
            FieldKind::Choice { options, selected } => options.get(*selected).cloned().unwrap_or_default(),
        }
    }
}

/// (name, label, default, step, min, max)
const NUMERIC_FIELDS: [(&str, &str, f64, f64, f64, f64); 3] = [
    ("tenure", "Tenure (months)", 12.0, 1.0, 0.0, 72.0),
    ("MonthlyCharges", "Monthly Charges ($)", 70.0, 5.0, 0.0, 500.0),
    ("TotalCharges", "Total Charges ($)", 1000.0, 100.0, 0.0, 20000.0),
];

const CHOICE_FIELDS: [(&str, &str); 9] = [
    ("Contract", "Contract"),
    ("PaperlessBilling", "Paperless Billing"),
    ("PaymentMethod", "Payment Method"),
    ("InternetService", "Internet Service"),
    ("StreamingTV", "Streaming TV"),
    ("StreamingMovies", "Streaming Movies"),
    ("TechSupport", "Tech Support"),
    ("OnlineSecurity", "Online Security"),
    ("MultipleLines", "Multiple Lines"),
];

#[derive(Debug, Clone, PartialEq)]
pub struct PredictForm {
    pub fields: Vec<FormField>,
}

impl PredictForm {
    pub fn from_schema(schema: &FeatureSchema) -> Self {
        let mut fields = Vec::new();

        for (name, label, value, step, min, max) in NUMERIC_FIELDS {
            if schema.index_of(name).is_some() {
                fields.push(FormField {
                    name: name.to_string(),
                    label,
                    kind: FieldKind::Number { value, step, min, max },
                });
            }
        }

        for (name, label) in CHOICE_FIELDS {
            if let Some(field) = schema.categorical_field(name) {
                fields.push(FormField {
                    name: name.to_string(),
                    label,
                    kind: FieldKind::Choice {
                        options: field.categories.clone(),
                        selected: 0,
                    },
                });
            }
        }

        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Step a number by `delta` steps (clamped) or cycle a choice.
    pub fn adjust(&mut self, index: usize, delta: i32) {
        let Some(field) = self.fields.get_mut(index) else {
            return;
        };
        match &mut field.kind {
            FieldKind::Number { value, step, min, max } => {
                *value = (*value + f64::from(delta) * *step).clamp(*min, *max);
            }
            FieldKind::Choice { options, selected } => {
                if options.is_empty() {
                    return;
                }
                let n = options.len() as i64;
                *selected = (*selected as i64 + i64::from(delta)).rem_euclid(n) as usize;
            }
        }
    }

    pub fn to_input(&self) -> FeatureInput {
        self.fields.iter().fold(FeatureInput::new(), |input, f| match &f.kind {
            FieldKind::Number { value, .. } => input.number(f.name.clone(), *value),
            FieldKind::Choice { options, selected } => match options.get(*selected) {
                Some(option) => input.category(f.name.clone(), option.clone()),
                None => input,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AlignMode, CategoricalField, FieldValue, SCHEMA_VERSION};
    use crate::features::align;

    fn schema() -> FeatureSchema {
        let contract = CategoricalField {
            name: "Contract".into(),
            baseline: "Month-to-month".into(),
            categories: vec!["Month-to-month".into(), "One year".into(), "Two year".into()],
        };
        let mut columns = vec!["tenure".to_string(), "MonthlyCharges".to_string()];
        columns.extend(contract.indicator_columns());
        FeatureSchema {
            version: SCHEMA_VERSION,
            label: "Churn".into(),
            columns,
            numeric: vec!["tenure".into(), "MonthlyCharges".into()],
            categorical: vec![contract],
        }
    }

    #[test]
    fn only_fields_known_to_the_schema_are_offered() {
        let form = PredictForm::from_schema(&schema());
        let names: Vec<&str> = form.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["tenure", "MonthlyCharges", "Contract"]);
    }

    #[test]
    fn adjust_clamps_numbers_and_cycles_choices() {
        let mut form = PredictForm::from_schema(&schema());
        form.adjust(0, -100);
        assert_eq!(form.fields[0].display_value(), "0");
        form.adjust(2, -1);
        assert_eq!(form.fields[2].display_value(), "Two year");
        form.adjust(2, 1);
        assert_eq!(form.fields[2].display_value(), "Month-to-month");
    }

    #[test]
    fn form_input_aligns_to_one_indicator() {
        let s = schema();
        let mut form = PredictForm::from_schema(&s);
        form.adjust(2, 1);
        let input = form.to_input();
        assert_eq!(input.get("Contract"), Some(&FieldValue::Category("One year".into())));

        let row = align(&input, &s, AlignMode::Strict).unwrap();
        assert_eq!(row.values, vec![12.0, 70.0, 1.0, 0.0]);
    }
}
