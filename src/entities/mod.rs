pub mod address;
pub mod cart;
pub mod cart_item;
pub mod category;
pub mod order;
pub mod order_item;
pub mod payment;
pub mod product;
pub mod product_variant;
pub mod user;

// Re-export entities
pub use address::{Entity as Address, Model as AddressModel};
pub use cart::{Entity as Cart, Model as CartModel};
pub use cart_item::{Entity as CartItem, Model as CartItemModel};
pub use category::{Entity as Category, Model as CategoryModel};
pub use order::{Entity as Order, Model as OrderModel, OrderStatus, PaymentState};
pub use order_item::{Entity as OrderItem, Model as OrderItemModel};
pub use payment::{CardAssociation, Entity as Payment, Model as PaymentModel, PaymentStatus};
pub use product::{Entity as Product, Model as ProductModel};
pub use product_variant::{Entity as ProductVariant, Model as ProductVariantModel};
pub use user::{Entity as User, Model as UserModel, UserRole};
