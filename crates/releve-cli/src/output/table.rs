use releve_core::model::Statement;

pub fn print(statement: &Statement) {
    println!(
        "{} statement of {} on {}",
        statement.statement_type,
        statement.main_account,
        statement.statement_date.format("%d/%m/%Y")
    );
    println!();

    println!("Balances:");
    for (account, per_currency) in &statement.new_balance {
        for (currency, new) in per_currency {
            match statement
                .previous_balance
                .get(account)
                .and_then(|m| m.get(currency))
            {
                Some(previous) => println!("  {account} ({currency}): {previous} -> {new}"),
                None => println!("  {account} ({currency}): -> {new}"),
            }
        }
    }
    println!();

    if statement.entries.is_empty() {
        println!("No entries.");
        return;
    }

    let rows = statement.flatten();
    let desc_width = rows
        .iter()
        .map(|r| first_line(&r.description).len())
        .max()
        .unwrap_or(10);

    println!("Entries:");
    for row in &rows {
        println!(
            "  {}  {:<desc_width$}  {:>14} {}",
            row.post_date.format("%d/%m/%Y"),
            first_line(&row.description),
            row.amount,
            row.currency,
        );
        for continuation in row.description.lines().skip(1) {
            println!("              {continuation}");
        }
    }
}

fn first_line(s: &str) -> &str {
    s.lines().next().unwrap_or("")
}
