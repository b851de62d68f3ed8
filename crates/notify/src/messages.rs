//! Mail composition for order lifecycle events.
//!
//! Bodies are plain text; the gateway converts newlines to `<br>` at send
//! time. Wording follows the storefront's established templates.

use rust_decimal::Decimal;

use bazari_core::domain::order::{Order, OrderStatus};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailMessage {
    pub subject: String,
    pub body: String,
}

/// Product name and pricing for one order line, resolved by the caller since
/// order lines only carry product ids.
#[derive(Clone, Debug, PartialEq)]
pub struct LineSummary {
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

fn item_list(lines: &[LineSummary]) -> String {
    lines
        .iter()
        .map(|line| format!("- {} x{} - ${}\n", line.name, line.quantity, line.unit_price))
        .collect()
}

pub fn seller_new_order(
    order: &Order,
    seller_name: &str,
    shop_name: &str,
    lines: &[LineSummary],
) -> EmailMessage {
    let subject = format!("New Order #{} - {}", order.order_number, shop_name);
    let body = format!(
        "Dear {seller_name},\n\
         \n\
         You have received a new order!\n\
         \n\
         Order Details:\n\
         - Order ID: #{number}\n\
         - Customer: {customer}\n\
         - Email: {email}\n\
         - Phone: {phone}\n\
         - Address: {address}\n\
         - Total Amount: ${total}\n\
         \n\
         Items:\n\
         {items}\
         \n\
         Please log in to your dashboard to manage this order.\n",
        number = order.order_number,
        customer = order.contact_name(),
        email = order.customer_email,
        phone = order.customer_phone,
        address = order.customer_address,
        total = order.total_amount,
        items = item_list(lines),
    );

    EmailMessage { subject, body }
}

pub fn buyer_order_placed(order: &Order, shop_name: &str, lines: &[LineSummary]) -> EmailMessage {
    let subject = format!("Order #{} Confirmed - {}", order.order_number, shop_name);
    let body = format!(
        "Hello {customer},\n\
         \n\
         Your order has been placed successfully!\n\
         \n\
         Order Details:\n\
         - Order Number: #{number}\n\
         - Shop: {shop_name}\n\
         - Total Amount: ${total}\n\
         \n\
         Ordered Items:\n\
         {items}\
         \n\
         You will receive updates as your order status changes.\n\
         \n\
         Thank you for your trust!\n\
         \n\
         Best regards,\n\
         {shop_name}\n",
        customer = order.contact_name(),
        number = order.order_number,
        total = order.total_amount,
        items = item_list(lines),
    );

    EmailMessage { subject, body }
}

fn status_blurb(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Confirmed => "Your order has been confirmed and is being prepared.",
        OrderStatus::Sent => "Your order has been shipped and is on its way!",
        OrderStatus::Cancelled => "Your order has been cancelled.",
        OrderStatus::Returned => "Your order return has been processed.",
        OrderStatus::Draft | OrderStatus::Waiting => "Your order status has been updated.",
    }
}

pub fn customer_status_update(order: &Order, shop_name: &str) -> EmailMessage {
    let subject = format!(
        "Order #{} Status Update - {}",
        order.order_number,
        order.status.display_name()
    );
    let body = format!(
        "Dear {customer},\n\
         \n\
         Your order status has been updated.\n\
         \n\
         Order Details:\n\
         - Order ID: #{number}\n\
         - Shop: {shop_name}\n\
         - Status: {status}\n\
         - Total: ${total}\n\
         \n\
         {blurb}\n\
         \n\
         Thank you for shopping with us!\n\
         \n\
         Best regards,\n\
         {shop_name}\n",
        customer = order.contact_name(),
        number = order.order_number,
        status = order.status.display_name(),
        total = order.total_amount,
        blurb = status_blurb(order.status),
    );

    EmailMessage { subject, body }
}

pub fn owner_order_reminder(
    order: &Order,
    owner_name: &str,
    shop_name: &str,
    period: &str,
) -> EmailMessage {
    let subject = format!("Reminder: Order #{} needs to be sent", order.order_number);
    let body = format!(
        "Dear {owner_name},\n\
         \n\
         This is a reminder that Order #{number} has been confirmed for {period} but hasn't been sent yet.\n\
         \n\
         Order Details:\n\
         - Customer: {customer}\n\
         - Total: ${total}\n\
         - Status: {status}\n\
         \n\
         Please update the order status to \"Sent\" once you've shipped it.\n\
         \n\
         Best regards,\n\
         {shop_name}\n",
        number = order.order_number,
        customer = order.contact_name(),
        total = order.total_amount,
        status = order.status.display_name(),
    );

    EmailMessage { subject, body }
}
