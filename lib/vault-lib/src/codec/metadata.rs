//! Metadata account records.
//!
//! Unlike vault fields these carry no value tag: every value is a string, and
//! boolean fields are spelled `"true"` or `"false"`.

use super::{DecodeError, Record, SkipReason, Skipped};
use crate::state::{
    CompanyModel, FundOpenfundsModel, ManagerModel, MetadataModel, ShareClassOpenfundsModel,
};
use borsh::{BorshDeserialize, BorshSerialize};
use num_enum::{IntoPrimitive, TryFromPrimitive};

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct MetadataField {
    pub name: u8,
    pub value: String,
}

trait MetadataValue: Sized {
    fn parse(raw: &str) -> Option<Self>;
    fn render(&self) -> String;
}

impl MetadataValue for String {
    fn parse(raw: &str) -> Option<Self> {
        Some(raw.to_owned())
    }

    fn render(&self) -> String {
        self.clone()
    }
}

impl MetadataValue for bool {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }

    fn render(&self) -> String {
        self.to_string()
    }
}

trait MetadataRecord {
    /// `Ok(false)` when the tag is unknown.
    fn apply(&mut self, name: u8, raw: &str) -> Result<bool, DecodeError>;
    fn to_fields(&self) -> Vec<MetadataField>;
}

macro_rules! metadata_record {
    ($tag:ident => $model:ident { $($value:literal => $variant:ident: $field:ident,)* }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
        #[repr(u8)]
        pub enum $tag {
            $($variant = $value,)*
        }

        impl MetadataRecord for $model {
            fn apply(&mut self, name: u8, raw: &str) -> Result<bool, DecodeError> {
                let Ok(name) = $tag::try_from(name) else {
                    return Ok(false);
                };
                match name {
                    $($tag::$variant => {
                        self.$field = Some(MetadataValue::parse(raw).ok_or_else(|| {
                            DecodeError::InvalidMetadataValue {
                                field: stringify!($variant),
                                value: raw.to_owned(),
                            }
                        })?);
                    })*
                }
                Ok(true)
            }

            fn to_fields(&self) -> Vec<MetadataField> {
                let mut fields = Vec::new();
                $(if let Some(value) = &self.$field {
                    fields.push(MetadataField {
                        name: $tag::$variant.into(),
                        value: value.render(),
                    });
                })*
                fields
            }
        }
    };
}

metadata_record!(CompanyField => CompanyModel {
    0 => FundGroupName: fund_group_name,
    1 => ManCo: man_co,
    2 => DomicileOfManCo: domicile_of_man_co,
    3 => EmailAddressOfManCo: email_address_of_man_co,
    4 => FundWebsiteOfManCo: fund_website_of_man_co,
});

metadata_record!(FundField => FundOpenfundsModel {
    0 => FundDomicileAlpha2: fund_domicile_alpha2,
    1 => LegalFundNameIncludingUmbrella: legal_fund_name_including_umbrella,
    2 => FiscalYearEnd: fiscal_year_end,
    3 => FundCurrency: fund_currency,
    4 => FundLaunchDate: fund_launch_date,
    5 => InvestmentObjective: investment_objective,
    6 => IsEtc: is_etc,
    7 => IsEuDirectiveRelevant: is_eu_directive_relevant,
    8 => IsFundOfFunds: is_fund_of_funds,
    9 => IsPassiveFund: is_passive_fund,
    10 => IsReit: is_reit,
    11 => LegalForm: legal_form,
    12 => LegalFundNameOnly: legal_fund_name_only,
    13 => OpenEndedOrClosedEndedFundStructure: open_ended_or_closed_ended_fund_structure,
    14 => TypeOfEuDirective: type_of_eu_directive,
    15 => UcitsVersion: ucits_version,
});

metadata_record!(ShareClassField => ShareClassOpenfundsModel {
    0 => Isin: isin,
    1 => ShareClassCurrency: share_class_currency,
    2 => CurrencyOfMinimalSubscription: currency_of_minimal_subscription,
    3 => FullShareClassName: full_share_class_name,
    4 => InvestmentStatus: investment_status,
    5 => MinimalInitialSubscriptionCategory: minimal_initial_subscription_category,
    6 => MinimalInitialSubscriptionInAmount: minimal_initial_subscription_in_amount,
    7 => MinimalInitialSubscriptionInShares: minimal_initial_subscription_in_shares,
    8 => ShareClassDistributionPolicy: share_class_distribution_policy,
    9 => ShareClassExtension: share_class_extension,
    10 => ShareClassLaunchDate: share_class_launch_date,
    11 => ShareClassLifecycle: share_class_lifecycle,
    12 => LaunchPrice: launch_price,
    13 => LaunchPriceCurrency: launch_price_currency,
    14 => LaunchPriceDate: launch_price_date,
    15 => CurrencyHedgeShareClass: currency_hedge_share_class,
    16 => HasLockUpForRedemption: has_lock_up_for_redemption,
    17 => HasPerformanceFee: has_performance_fee,
    18 => IsEtf: is_etf,
    19 => LockUpComment: lock_up_comment,
    20 => LockUpPeriodInDays: lock_up_period_in_days,
    21 => ManagementFeeApplied: management_fee_applied,
    22 => ManagementFeeMaximum: management_fee_maximum,
    23 => PerformanceFeeApplied: performance_fee_applied,
});

metadata_record!(ManagerField => ManagerModel {
    0 => PortfolioManagerName: portfolio_manager_name,
});

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedMetadata {
    pub metadata: MetadataModel,
    pub skipped: Vec<Skipped>,
}

fn decode_into<T: MetadataRecord + Default>(
    record: Record,
    fields: &[MetadataField],
    skipped: &mut Vec<Skipped>,
) -> Result<T, DecodeError> {
    let mut target = T::default();
    for field in fields {
        if !target.apply(field.name, &field.value)? {
            tracing::warn!("skipping metadata tag {} in {:?} record", field.name, record);
            skipped.push(Skipped {
                record,
                name: field.name,
                reason: SkipReason::UnknownTag,
            });
        }
    }
    Ok(target)
}

pub fn decode_metadata(
    company: &[MetadataField],
    fund: &[MetadataField],
    share_classes: &[Vec<MetadataField>],
    managers: &[Vec<MetadataField>],
) -> Result<DecodedMetadata, DecodeError> {
    let mut skipped = Vec::new();
    let metadata = MetadataModel {
        company: decode_into(Record::Company, company, &mut skipped)?,
        fund: decode_into(Record::Fund, fund, &mut skipped)?,
        share_classes: share_classes
            .iter()
            .enumerate()
            .map(|(i, fields)| decode_into(Record::ShareClass(i), fields, &mut skipped))
            .collect::<Result<_, _>>()?,
        managers: managers
            .iter()
            .enumerate()
            .map(|(i, fields)| decode_into(Record::Manager(i), fields, &mut skipped))
            .collect::<Result<_, _>>()?,
    };
    Ok(DecodedMetadata { metadata, skipped })
}

/// Company, fund, share class and manager records, in account order.
pub type EncodedMetadata = (
    Vec<MetadataField>,
    Vec<MetadataField>,
    Vec<Vec<MetadataField>>,
    Vec<Vec<MetadataField>>,
);

pub fn encode_metadata(metadata: &MetadataModel) -> EncodedMetadata {
    (
        metadata.company.to_fields(),
        metadata.fund.to_fields(),
        metadata
            .share_classes
            .iter()
            .map(MetadataRecord::to_fields)
            .collect(),
        metadata
            .managers
            .iter()
            .map(MetadataRecord::to_fields)
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: impl Into<u8>, value: &str) -> MetadataField {
        MetadataField {
            name: name.into(),
            value: value.to_owned(),
        }
    }

    #[test]
    fn test_decode_metadata() {
        let decoded = decode_metadata(
            &[field(CompanyField::ManCo, "Acme Capital")],
            &[
                field(FundField::FundCurrency, "USD"),
                field(FundField::IsReit, "false"),
                field(99u8, "from the future"),
            ],
            &[vec![field(ShareClassField::HasLockUpForRedemption, "true")]],
            &[vec![field(ManagerField::PortfolioManagerName, "Alice")]],
        )
        .unwrap();
        let metadata = decoded.metadata;
        assert_eq!(metadata.company.man_co.as_deref(), Some("Acme Capital"));
        assert_eq!(metadata.fund.fund_currency.as_deref(), Some("USD"));
        assert_eq!(metadata.fund.is_reit, Some(false));
        assert_eq!(metadata.share_classes[0].has_lock_up_for_redemption, Some(true));
        assert_eq!(
            metadata.managers[0].portfolio_manager_name.as_deref(),
            Some("Alice")
        );
        assert_eq!(
            decoded.skipped,
            [Skipped {
                record: Record::Fund,
                name: 99,
                reason: SkipReason::UnknownTag,
            }]
        );
    }

    #[test]
    fn test_invalid_boolean() {
        let error =
            decode_metadata(&[], &[field(FundField::IsEtc, "yes")], &[], &[]).unwrap_err();
        assert!(matches!(
            error,
            DecodeError::InvalidMetadataValue { field: "IsEtc", .. }
        ));
    }

    #[test]
    fn test_metadata_round_trip() {
        let metadata = MetadataModel {
            company: CompanyModel {
                fund_group_name: Some("Acme".to_owned()),
                ..<_>::default()
            },
            fund: FundOpenfundsModel {
                fund_launch_date: Some("2024-05-01".to_owned()),
                is_passive_fund: Some(true),
                ..<_>::default()
            },
            share_classes: vec![ShareClassOpenfundsModel {
                isin: Some("XS1082172823".to_owned()),
                is_etf: Some(false),
                ..<_>::default()
            }],
            managers: vec![<_>::default()],
        };
        let (company, fund, share_classes, managers) = encode_metadata(&metadata);
        let decoded = decode_metadata(&company, &fund, &share_classes, &managers).unwrap();
        assert_eq!(decoded.metadata, metadata);
        assert!(decoded.skipped.is_empty());
    }
}
