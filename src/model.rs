//! Wire and state types shared by the purchase flow and the payment widget.

use std::collections::BTreeMap;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Country code → VAT percentage, as returned next to the country list.
pub type VatTable = BTreeMap<String, f64>;

/// Lab selection and totals carried over from the license picker step.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseDraft {
    #[serde(default)]
    pub labs: Vec<LabSelection>,
    #[serde(default)]
    pub sub_total_price: f64,
    #[serde(default)]
    pub total_price: f64,
}

/// One row of the license picker.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LabSelection {
    pub id: i64,
    #[serde(default)]
    pub license: u32,
    #[serde(default)]
    pub month_subscription: u32,
    #[serde(flatten)]
    pub kind: LabKind,
}

/// A single lab, or a bundle of labs sold under one product group.
///
/// Only `lab_type: "individual"` is a single lab. Every other type the
/// catalogue sends (`package`, `group`, ...) is treated as a bundle.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(try_from = "RawLabKind", into = "RawLabKind")]
pub enum LabKind {
    Individual { external_id: i64 },
    Package { products: Vec<PackageMember> },
}

#[derive(Serialize, Deserialize)]
struct RawLabKind {
    lab_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    external_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    products: Option<Vec<PackageMember>>,
}

impl TryFrom<RawLabKind> for LabKind {
    type Error = String;

    fn try_from(raw: RawLabKind) -> Result<Self, Self::Error> {
        if raw.lab_type == "individual" {
            let external_id = raw
                .external_id
                .ok_or_else(|| "individual lab without external_id".to_string())?;
            Ok(LabKind::Individual { external_id })
        } else {
            Ok(LabKind::Package {
                products: raw.products.unwrap_or_default(),
            })
        }
    }
}

impl From<LabKind> for RawLabKind {
    fn from(kind: LabKind) -> Self {
        match kind {
            LabKind::Individual { external_id } => RawLabKind {
                lab_type: "individual".into(),
                external_id: Some(external_id),
                products: None,
            },
            LabKind::Package { products } => RawLabKind {
                lab_type: "package".into(),
                external_id: None,
                products: Some(products),
            },
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PackageMember {
    pub external_id: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Country {
    pub id: i64,
    pub code: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct CountryList {
    pub countries: Vec<Country>,
    #[serde(default)]
    pub countries_vat: VatTable,
}

/// Who is buying. Travels as the integer `1` / `2`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum InstitutionType {
    #[default]
    Individual,
    Organization,
}

impl InstitutionType {
    pub fn as_code(self) -> u8 {
        match self {
            InstitutionType::Individual => 1,
            InstitutionType::Organization => 2,
        }
    }

    /// Anything other than `1` is treated as an organizational buyer.
    pub fn from_code(code: u8) -> Self {
        if code == 1 {
            InstitutionType::Individual
        } else {
            InstitutionType::Organization
        }
    }
}

impl Serialize for InstitutionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_code())
    }
}

impl<'de> Deserialize<'de> for InstitutionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = u8::deserialize(deserializer)?;
        match code {
            1 | 2 => Ok(InstitutionType::from_code(code)),
            other => Err(de::Error::custom(format!(
                "unknown institution type {}",
                other
            ))),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    Manual,
}

/// A purchase order row. The backend tells the two shapes apart by the
/// presence of `product` or `product_group`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum LineItem {
    Individual {
        product: i64,
        labster_labs: Vec<i64>,
        item_count: u32,
        month_subscription: u32,
    },
    Group {
        product_group: i64,
        labster_labs: Vec<i64>,
        item_count: u32,
        month_subscription: u32,
    },
}

impl LineItem {
    /// `None` for rows the user left at zero licenses.
    pub fn from_selection(lab: &LabSelection) -> Option<Self> {
        if lab.license == 0 {
            return None;
        }
        let item = match &lab.kind {
            LabKind::Individual { external_id } => LineItem::Individual {
                product: lab.id,
                labster_labs: vec![*external_id],
                item_count: lab.license,
                month_subscription: lab.month_subscription,
            },
            LabKind::Package { products } => LineItem::Group {
                product_group: lab.id,
                labster_labs: products.iter().map(|p| p.external_id).collect(),
                item_count: lab.license,
                month_subscription: lab.month_subscription,
            },
        };
        Some(item)
    }

    pub fn labster_labs(&self) -> &[i64] {
        match self {
            LineItem::Individual { labster_labs, .. } | LineItem::Group { labster_labs, .. } => {
                labster_labs
            }
        }
    }

    pub fn item_count(&self) -> u32 {
        match self {
            LineItem::Individual { item_count, .. } | LineItem::Group { item_count, .. } => {
                *item_count
            }
        }
    }
}

pub fn build_line_items(labs: &[LabSelection]) -> Vec<LineItem> {
    labs.iter().filter_map(LineItem::from_selection).collect()
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PurchaseOrder {
    pub user: i64,
    pub is_teacher: bool,
    pub payment_type: PaymentMethod,
    pub institution_type: InstitutionType,
    pub institution_name: String,
    pub country: i64,
    pub total_before_tax: f64,
    pub vat_number: String,
    pub list_product: Vec<LineItem>,
}

/// Body of a successful purchase call; `id` is the payment id.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PurchaseReceipt {
    pub id: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LabLicense {
    pub lab_id: i64,
    pub license_count: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DuplicateLabsRequest {
    pub labs: Vec<LabLicense>,
    pub payment_id: i64,
    pub token: String,
}

impl DuplicateLabsRequest {
    /// One entry per external lab id of every line item.
    pub fn new(items: &[LineItem], payment_id: i64, token: impl Into<String>) -> Self {
        let labs = items
            .iter()
            .flat_map(|item| {
                let count = item.item_count();
                item.labster_labs().iter().map(move |&lab_id| LabLicense {
                    lab_id,
                    license_count: count,
                })
            })
            .collect();
        Self {
            labs,
            payment_id,
            token: token.into(),
        }
    }
}

/// Everything the payment widget is bound to. Fixed for the widget's lifetime.
#[derive(Clone, Debug, PartialEq)]
pub struct PaymentSession {
    pub payment_id: String,
    pub email: String,
    pub amount: f64,
    pub description: String,
    pub course_id: String,
}

/// Token handed back by the hosted checkout form.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CheckoutToken {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChargeRequest {
    pub stripe_token: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EnrollmentRequest {
    pub course_id: String,
    pub payment_id: String,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn individual(id: i64, external_id: i64, license: u32) -> LabSelection {
        LabSelection {
            id,
            license,
            month_subscription: 12,
            kind: LabKind::Individual { external_id },
        }
    }

    #[test]
    fn individual_lab_becomes_single_id_line_item() {
        let items = build_line_items(&[individual(7, 701, 3)]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].item_count(), 3);
        assert_eq!(items[0].labster_labs(), &[701]);
        assert!(matches!(items[0], LineItem::Individual { product: 7, .. }));
    }

    #[test]
    fn group_lab_keeps_member_order() {
        let lab = LabSelection {
            id: 9,
            license: 5,
            month_subscription: 6,
            kind: LabKind::Package {
                products: vec![
                    PackageMember { external_id: 30 },
                    PackageMember { external_id: 10 },
                ],
            },
        };
        let items = build_line_items(&[lab]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].labster_labs(), &[30, 10]);
        assert!(matches!(items[0], LineItem::Group { product_group: 9, .. }));
    }

    #[test]
    fn zero_license_rows_are_skipped() {
        let items = build_line_items(&[individual(1, 100, 0), individual(2, 200, 1)]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].labster_labs(), &[200]);
    }

    #[test]
    fn line_items_use_backend_keys() {
        let items = vec![
            LineItem::from_selection(&individual(7, 701, 3)).unwrap(),
            LineItem::Group {
                product_group: 9,
                labster_labs: vec![1, 2],
                item_count: 2,
                month_subscription: 12,
            },
        ];
        let value = serde_json::to_value(&items).unwrap();
        assert_eq!(value[0]["product"], 7);
        assert!(value[0].get("product_group").is_none());
        assert_eq!(value[1]["product_group"], 9);
        assert!(value[1].get("product").is_none());
    }

    #[test]
    fn draft_reads_previous_step_json() {
        let draft: PurchaseDraft = serde_json::from_value(json!({
            "labs": [
                {"id": 1, "license": 2, "month_subscription": 12,
                 "lab_type": "individual", "external_id": 55},
                {"id": 2, "license": 1, "month_subscription": 12,
                 "lab_type": "package", "products": [{"external_id": 3}, {"external_id": 4}]}
            ],
            "subTotalPrice": 120.0,
            "totalPrice": 150.0
        }))
        .unwrap();
        assert_eq!(draft.labs.len(), 2);
        assert_eq!(draft.labs[0].kind, LabKind::Individual { external_id: 55 });
        assert_eq!(draft.sub_total_price, 120.0);
        assert_eq!(draft.total_price, 150.0);
    }

    #[test]
    fn unknown_lab_types_are_bundles() {
        let lab: LabSelection = serde_json::from_value(json!({
            "id": 4, "license": 1, "month_subscription": 6,
            "lab_type": "bundle", "products": [{"external_id": 8}]
        }))
        .unwrap();
        assert_eq!(
            lab.kind,
            LabKind::Package {
                products: vec![PackageMember { external_id: 8 }]
            }
        );

        let group: LabSelection = serde_json::from_value(json!({
            "id": 5, "lab_type": "group"
        }))
        .unwrap();
        assert_eq!(group.kind, LabKind::Package { products: vec![] });

        let broken = serde_json::from_value::<LabSelection>(json!({
            "id": 6, "lab_type": "individual"
        }));
        assert!(broken.is_err());
    }

    #[test]
    fn lab_kind_is_written_back_with_its_type() {
        let value = serde_json::to_value(individual(7, 701, 3)).unwrap();
        assert_eq!(value["lab_type"], "individual");
        assert_eq!(value["external_id"], 701);
        assert!(value.get("products").is_none());
    }

    #[test]
    fn institution_type_travels_as_integer() {
        assert_eq!(serde_json::to_value(InstitutionType::Individual).unwrap(), json!(1));
        assert_eq!(
            serde_json::from_value::<InstitutionType>(json!(2)).unwrap(),
            InstitutionType::Organization
        );
        assert!(serde_json::from_value::<InstitutionType>(json!(7)).is_err());
    }

    #[test]
    fn duplicate_request_expands_every_lab() {
        let items = vec![
            LineItem::from_selection(&individual(7, 701, 3)).unwrap(),
            LineItem::Group {
                product_group: 9,
                labster_labs: vec![1, 2],
                item_count: 4,
                month_subscription: 12,
            },
        ];
        let req = DuplicateLabsRequest::new(&items, 88, "tok");
        assert_eq!(
            req.labs,
            vec![
                LabLicense { lab_id: 701, license_count: 3 },
                LabLicense { lab_id: 1, license_count: 4 },
                LabLicense { lab_id: 2, license_count: 4 },
            ]
        );
        assert_eq!(req.payment_id, 88);
    }
}
