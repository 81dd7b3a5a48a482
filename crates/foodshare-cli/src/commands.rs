//! Command dispatch.

use foodshare_core::{
    ClaimDetail, Database, DashboardSummary, ListingDetail, Provider, QueryParam, Receiver,
    Result, ResultTable, Value,
};
use tracing::debug;

use crate::formatter::Formatter;
use crate::{listing_filter, query_params, ClaimCommand, Command};

/// Execute one command and return its formatted output.
pub fn execute(db: &mut Database, command: Command, formatter: &dyn Formatter) -> Result<String> {
    debug!(?command, "executing command");

    let output = match command {
        Command::Ingest(args) => {
            let sources = args.into_source_config();
            let report = db.ingest(&sources)?;
            formatter.format_report(&report)
        }

        Command::Queries => formatter.format_table(&catalog_table(db)),

        Command::Query { name, city, today } => {
            let table = db.run_query(&name, &query_params(city, today))?;
            formatter.format_table(&table)
        }

        Command::Sql { text } => formatter.format_table(&db.query_sql(&text)?),

        Command::Claim { action } => match action {
            ClaimCommand::Submit {
                food_id,
                receiver_id,
            } => {
                let claim = db.submit_claim(food_id, receiver_id)?;
                formatter.format_claim("submitted", &claim)
            }
            ClaimCommand::Update { claim_id, status } => {
                let claim = db.update_claim_status(claim_id, &status)?;
                formatter.format_claim("updated", &claim)
            }
        },

        Command::Claims => formatter.format_table(&claim_details_table(&db.claim_details()?)),

        Command::Listings {
            city,
            food_type,
            meal_type,
        } => {
            let filter = listing_filter(city, food_type, meal_type);
            formatter.format_table(&listings_table(&db.listings(&filter)?))
        }

        Command::Providers { provider_type } => {
            let providers = db.providers(provider_type.as_deref())?;
            formatter.format_table(&providers_table(&providers))
        }

        Command::Receivers { receiver_type } => {
            let receivers = db.receivers(receiver_type.as_deref())?;
            formatter.format_table(&receivers_table(&receivers))
        }

        Command::Dashboard => formatter.format_table(&dashboard_table(&db.dashboard()?)),
    };

    Ok(output)
}

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

fn optional_text(s: Option<&str>) -> Value {
    s.map(text).unwrap_or(Value::Null)
}

fn optional_integer(i: Option<i64>) -> Value {
    i.map(Value::Integer).unwrap_or(Value::Null)
}

fn optional_display(value: Option<impl std::fmt::Display>) -> Value {
    value
        .map(|v| Value::Text(v.to_string()))
        .unwrap_or(Value::Null)
}

fn catalog_table(db: &Database) -> ResultTable {
    let rows = db
        .catalog()
        .iter()
        .map(|q| {
            let params: Vec<&str> = q
                .params
                .iter()
                .map(|p| match p {
                    QueryParam::City => "--city",
                    QueryParam::Today => "--today",
                })
                .collect();
            vec![text(q.name), text(q.title), text(&params.join(" "))]
        })
        .collect();
    ResultTable::new(columns(&["Name", "Title", "Parameters"]), rows)
}

fn claim_details_table(details: &[ClaimDetail]) -> ResultTable {
    let rows = details
        .iter()
        .map(|c| {
            vec![
                Value::Integer(c.claim_id),
                text(&c.food_name),
                optional_integer(c.quantity),
                text(&c.receiver_name),
                optional_display(c.status),
                optional_display(c.timestamp),
            ]
        })
        .collect();
    ResultTable::new(
        columns(&[
            "Claim_ID",
            "Food_Name",
            "Quantity",
            "Receiver",
            "Status",
            "Timestamp",
        ]),
        rows,
    )
}

fn listings_table(listings: &[ListingDetail]) -> ResultTable {
    let rows = listings
        .iter()
        .map(|d| {
            let l = &d.listing;
            vec![
                Value::Integer(l.food_id),
                text(&l.food_name),
                optional_integer(l.quantity),
                optional_display(l.expiry_date),
                text(&l.location),
                text(&l.food_type),
                text(&l.meal_type),
                optional_text(d.provider_name.as_deref()),
                optional_text(d.provider_contact.as_deref()),
            ]
        })
        .collect();
    ResultTable::new(
        columns(&[
            "Food_ID",
            "Food_Name",
            "Quantity",
            "Expiry_Date",
            "Location",
            "Food_Type",
            "Meal_Type",
            "Provider",
            "Provider_Contact",
        ]),
        rows,
    )
}

fn providers_table(providers: &[Provider]) -> ResultTable {
    let rows = providers
        .iter()
        .map(|p| {
            vec![
                Value::Integer(p.provider_id),
                text(&p.name),
                text(&p.provider_type),
                text(&p.address),
                text(&p.city),
                text(&p.contact),
            ]
        })
        .collect();
    ResultTable::new(
        columns(&["Provider_ID", "Name", "Type", "Address", "City", "Contact"]),
        rows,
    )
}

fn receivers_table(receivers: &[Receiver]) -> ResultTable {
    let rows = receivers
        .iter()
        .map(|r| {
            vec![
                Value::Integer(r.receiver_id),
                text(&r.name),
                text(&r.receiver_type),
                text(&r.city),
                text(&r.contact),
            ]
        })
        .collect();
    ResultTable::new(
        columns(&["Receiver_ID", "Name", "Type", "City", "Contact"]),
        rows,
    )
}

fn dashboard_table(summary: &DashboardSummary) -> ResultTable {
    let rows = vec![
        vec![text("Providers"), Value::Integer(summary.providers)],
        vec![text("Provider cities"), Value::Integer(summary.provider_cities)],
        vec![text("Receivers"), Value::Integer(summary.receivers)],
        vec![text("Receiver cities"), Value::Integer(summary.receiver_cities)],
        vec![text("Food listings"), Value::Integer(summary.listings)],
        vec![text("Total quantity"), Value::Integer(summary.total_quantity)],
        vec![text("Claims"), Value::Integer(summary.claims)],
        vec![text("Completed claims"), Value::Integer(summary.completed_claims)],
        vec![
            text("Success rate (%)"),
            summary
                .success_rate
                .map(|rate| Value::Real((rate * 100.0).round() / 100.0))
                .unwrap_or(Value::Null),
        ],
    ];
    ResultTable::new(columns(&["Metric", "Value"]), rows)
}
