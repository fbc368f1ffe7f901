//! Sidebar navigation derived from the user's role.
//!
//! The visible menu is always the default entries followed by the entries
//! the role table grants. The table is static; nothing mutates it.

use crate::Role;

/// A sidebar entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NavItem {
    pub path: &'static str,
    pub label: &'static str,
}

const fn item(path: &'static str, label: &'static str) -> NavItem {
    NavItem { path, label }
}

/// Entries shown to everyone, signed in or not.
pub static DEFAULT_ROUTES: &[NavItem] = &[item("/", "Tienda")];

static ADMIN_ROUTES: &[NavItem] = &[
    item("/empresas", "Empresas"),
    item("/sucursales", "Sucursal"),
    item("/productos", "Productos"),
    item("/unidadmedida", "Medidas"),
    item("/ingredientes", "Ingredientes"),
    item("/promociones", "Promociones"),
    item("/pedidos", "Pedidos"),
    item("/clientes", "Clientes"),
    item("/categorias", "Categorias"),
    item("/reportes", "Reportes"),
    item("/pedidos-cajero", "Cajero"),
    item("/pedidos-delivery", "Delivery"),
    item("/pedidos-cocinero", "Cocinero"),
    item("/usuarios", "Usuarios"),
];

static COOK_ROUTES: &[NavItem] = &[
    item("/unidadmedida", "Medidas"),
    item("/ingredientes", "Ingredientes"),
    item("/promociones", "Promociones"),
    item("/pedidos-cocinero", "Cocinero"),
];

static CASHIER_ROUTES: &[NavItem] = &[item("/pedidos-cajero", "Cajero")];

static DELIVERY_ROUTES: &[NavItem] = &[item("/pedidos-delivery", "Delivery")];

static CLIENT_ROUTES: &[NavItem] = &[item("/misPedidos", "Mis Pedidos")];

/// The entries a role grants on top of [`DEFAULT_ROUTES`].
#[must_use]
pub const fn role_routes(role: Role) -> &'static [NavItem] {
    match role {
        Role::Admin => ADMIN_ROUTES,
        Role::Cocinero => COOK_ROUTES,
        Role::Cajero => CASHIER_ROUTES,
        Role::Delivery => DELIVERY_ROUTES,
        Role::Cliente => CLIENT_ROUTES,
        Role::Empleado => &[],
    }
}

/// The sidebar for a (possibly absent) role.
#[must_use]
pub fn routes_for(role: Option<Role>) -> Vec<NavItem> {
    let granted = role.map_or(&[][..], role_routes);
    DEFAULT_ROUTES.iter().chain(granted).copied().collect()
}
